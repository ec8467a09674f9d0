// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

#![allow(dead_code)]

use codicon::Encoder;
use sev_owner::{
    api::platform::{Platform, PlatformStatusFlags, State, Status},
    certs::{ca, sev, Chain, Signer, Usage},
    crypto::PrivateKey,
    error::{Error, Indeterminate},
    Build, Version,
};

/// A complete, correctly signed chain and the keys that produced it.
pub struct Owner {
    pub chain: Chain,
    pub ark: PrivateKey<Usage>,
    pub ask: PrivateKey<Usage>,
    pub cek: PrivateKey<Usage>,
    pub oca: PrivateKey<Usage>,
    pub pek: PrivateKey<Usage>,
    pub pdh: PrivateKey<Usage>,
}

impl Owner {
    pub fn new() -> Self {
        let (mut ark, ark_key) = ca::Certificate::generate(Usage::ARK, 2048).unwrap();
        ark_key.sign(&mut ark).unwrap();

        let (mut ask, ask_key) = ca::Certificate::generate(Usage::ASK, 2048).unwrap();
        ark_key.sign(&mut ask).unwrap();

        let (mut cek, cek_key) = sev::Certificate::generate(Usage::CEK).unwrap();
        ask_key.sign(&mut cek).unwrap();

        let (mut oca, oca_key) = sev::Certificate::generate(Usage::OCA).unwrap();
        oca_key.sign(&mut oca).unwrap();

        let (mut pek, pek_key) = sev::Certificate::generate(Usage::PEK).unwrap();
        cek_key.sign(&mut pek).unwrap();
        oca_key.sign(&mut pek).unwrap();

        let (mut pdh, pdh_key) = sev::Certificate::generate(Usage::PDH).unwrap();
        pek_key.sign(&mut pdh).unwrap();

        Self {
            chain: Chain {
                ca: ca::Chain { ask, ark },
                sev: sev::Chain { pdh, pek, oca, cek },
            },
            ark: ark_key,
            ask: ask_key,
            cek: cek_key,
            oca: oca_key,
            pek: pek_key,
            pdh: pdh_key,
        }
    }

    /// The vendor blob: ASK followed by ARK.
    pub fn ask_ark(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.chain.ca.encode(&mut buf, ()).unwrap();
        buf
    }

    pub fn cek(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.chain.sev.cek.encode(&mut buf, ()).unwrap();
        buf
    }
}

/// A platform answering from memory.
pub struct MockPlatform {
    pub status: Status,
    pub chain: sev::Chain,

    /// Countersigns imported PEKs the way the firmware does with its CEK.
    pub cek: Option<PrivateKey<Usage>>,
}

impl MockPlatform {
    pub fn new(chain: sev::Chain, minor: u8) -> Self {
        Self {
            status: Status {
                build: Build {
                    version: Version { major: 0, minor },
                    build: 3,
                },
                state: State::Initialized,
                flags: PlatformStatusFlags::empty(),
                guests: 0,
            },
            chain,
            cek: None,
        }
    }

    pub fn with_cek(mut self, cek: PrivateKey<Usage>) -> Self {
        self.cek = Some(cek);
        self
    }
}

impl Platform for MockPlatform {
    fn platform_status(&mut self) -> Result<Status, Indeterminate<Error>> {
        Ok(self.status.clone())
    }

    fn pdh_cert_export(&mut self) -> Result<sev::Chain, Indeterminate<Error>> {
        Ok(self.chain)
    }

    fn pek_generate(&mut self) -> Result<(), Indeterminate<Error>> {
        self.status.flags.remove(PlatformStatusFlags::OWNED);
        Ok(())
    }

    fn pek_csr(&mut self) -> Result<sev::Certificate, Indeterminate<Error>> {
        let mut csr = self.chain.pek;
        csr.sigs = [sev::Slot::default(); 2];
        Ok(csr)
    }

    fn pek_cert_import(
        &mut self,
        pek: &sev::Certificate,
        oca: &sev::Certificate,
    ) -> Result<(), Indeterminate<Error>> {
        let mut pek = *pek;
        if let Some(cek) = &self.cek {
            cek.sign(&mut pek)?;
        }

        self.chain.pek = pek;
        self.chain.oca = *oca;
        self.status.flags.insert(PlatformStatusFlags::OWNED);
        Ok(())
    }
}
