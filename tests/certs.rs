// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

mod common;

use codicon::{Decoder, Encoder};
use common::Owner;
use sev_owner::{
    cached_chain,
    certs::{ca, sev, Chain, Signer, Usage, Verifiable},
    error::Error,
};

fn encode<T: Encoder<(), Error = Error>>(value: &T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf, ()).unwrap();
    buf
}

fn failure(chain: &Chain) -> Error {
    match chain.verify() {
        Ok(_) => panic!("chain unexpectedly verified"),
        Err(e) => e,
    }
}

#[test_log::test]
fn chain_verifies() {
    let owner = Owner::new();
    let pdh = (&owner.chain).verify().unwrap();
    assert_eq!(*pdh, owner.chain.sev.pdh);

    assert!(owner.chain.ca.ark.is_self_signed());
    assert!(!owner.chain.ca.ask.is_self_signed());
}

#[test_log::test]
#[serial_test::serial]
fn cached_chain_round_trip() {
    let owner = Owner::new();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("nested").join("chain");
    std::env::set_var("SEV_CHAIN", &file);

    assert_eq!(cached_chain::path().first(), Some(&file));
    assert_eq!(cached_chain::put(&owner.chain).unwrap(), file);
    assert_eq!(cached_chain::get().unwrap(), owner.chain);

    std::env::remove_var("SEV_CHAIN");
}

#[test_log::test]
fn round_trip() {
    let owner = Owner::new();
    let chain = &owner.chain;

    for cert in [&chain.sev.pdh, &chain.sev.pek, &chain.sev.oca, &chain.sev.cek] {
        let buf = encode(cert);
        assert_eq!(buf.len(), sev::SIZE);
        assert_eq!(sev::Certificate::decode(&buf[..], ()).unwrap(), *cert);
    }

    for cert in [&chain.ca.ask, &chain.ca.ark] {
        let buf = encode(cert);
        assert_eq!(buf.len(), cert.size());
        assert_eq!(&ca::Certificate::decode(&buf[..], ()).unwrap(), cert);
    }

    let buf = encode(chain);
    assert_eq!(buf.len(), 4 * sev::SIZE + 2 * 832);
    assert_eq!(&Chain::decode(&buf[..], ()).unwrap(), chain);
}

#[test_log::test]
fn ca_blob_4096() {
    let (mut ark, ark_key) = ca::Certificate::generate(Usage::ARK, 4096).unwrap();
    ark_key.sign(&mut ark).unwrap();
    let (mut ask, _) = ca::Certificate::generate(Usage::ASK, 4096).unwrap();
    ark_key.sign(&mut ask).unwrap();

    assert_eq!(ark.size(), 1600);
    assert_eq!(ask.size(), 1600);

    let mut blob = encode(&ask);
    blob.extend_from_slice(&encode(&ark));

    let chain = ca::Chain::from_bytes(&blob).unwrap();
    assert_eq!(chain.ask, ask);
    assert_eq!(chain.ark, ark);
    assert_eq!(chain.verify().unwrap(), &ask);

    blob.push(0);
    assert!(matches!(
        ca::Chain::from_bytes(&blob),
        Err(Error::MalformedCertificate)
    ));
}

#[test_log::test]
fn exported_ask_verifies_cek() {
    let owner = Owner::new();
    let ask = owner.chain.ca.ask.export_public_key().unwrap();
    assert_eq!(ask.body.usage, Usage::ASK);
    (&ask, &owner.chain.sev.cek).verify().unwrap();
    (&owner.chain.ca.ask, &owner.chain.sev.cek).verify().unwrap();
}

#[test_log::test]
fn oca_self_signed() {
    let owner = Owner::new();
    let oca = &owner.chain.sev.oca;
    (oca, oca).verify().unwrap();
}

#[test_log::test]
fn bit_flip_fails_at_its_stage() {
    let owner = Owner::new();

    let mut chain = owner.chain.clone();
    chain.ca.ark.signature[0] ^= 1;
    assert!(matches!(failure(&chain), Error::InvalidSignature(Usage::ARK)));

    let mut chain = owner.chain.clone();
    chain.ca.ask.signature[0] ^= 1;
    assert!(matches!(failure(&chain), Error::InvalidSignature(Usage::ASK)));

    let mut chain = owner.chain.clone();
    chain.sev.cek.sigs[0].sig[0] ^= 1;
    assert!(matches!(failure(&chain), Error::InvalidSignature(Usage::CEK)));

    for slot in 0..2 {
        let mut chain = owner.chain.clone();
        chain.sev.pek.sigs[slot].sig[0] ^= 1;
        assert!(matches!(failure(&chain), Error::InvalidSignature(Usage::PEK)));

        let mut chain = owner.chain.clone();
        chain.sev.pek.sigs[slot].sig[72] ^= 1;
        assert!(matches!(failure(&chain), Error::InvalidSignature(Usage::PEK)));
    }

    let mut chain = owner.chain.clone();
    chain.sev.pdh.sigs[0].sig[0] ^= 1;
    assert!(matches!(failure(&chain), Error::InvalidSignature(Usage::PDH)));
}

#[test_log::test]
fn body_flip_fails() {
    let owner = Owner::new();

    let mut chain = owner.chain.clone();
    chain.ca.ask.modulus[5] ^= 1;
    assert!(matches!(failure(&chain), Error::InvalidSignature(Usage::ASK)));

    let mut chain = owner.chain.clone();
    chain.sev.pdh.body.firmware.minor ^= 1;
    assert!(matches!(failure(&chain), Error::InvalidSignature(Usage::PDH)));
}

#[test_log::test]
fn owner_signature_zeroed() {
    let owner = Owner::new();
    let mut chain = owner.chain.clone();

    let slot = chain
        .sev
        .pek
        .sigs
        .iter()
        .position(|s| s.usage == Usage::OCA)
        .unwrap();
    chain.sev.pek.sigs[slot].sig = [0u8; 512];

    assert!(matches!(failure(&chain), Error::InvalidSignature(Usage::PEK)));
}

#[test_log::test]
fn wrong_signature_count() {
    let owner = Owner::new();

    let (mut pek, _) = sev::Certificate::generate(Usage::PEK).unwrap();
    owner.cek.sign(&mut pek).unwrap();
    let mut chain = owner.chain.clone();
    chain.sev.pek = pek;

    assert!(matches!(
        failure(&chain),
        Error::SignatureCountMismatch {
            usage: Usage::PEK,
            expected: 2,
            found: 1,
        }
    ));
}

#[test_log::test]
fn missing_parent() {
    let owner = Owner::new();
    let chain = &owner.chain.sev;

    assert!(matches!(
        (&chain.cek, &chain.pek).verify(),
        Err(Error::MissingParent(Usage::OCA))
    ));
}

#[test_log::test]
fn chain_order_enforced() {
    let owner = Owner::new();
    let mut chain = owner.chain.clone();
    std::mem::swap(&mut chain.sev.pek, &mut chain.sev.oca);

    let buf = encode(&chain);
    assert!(matches!(
        Chain::decode(&buf[..], ()),
        Err(Error::MalformedCertificate)
    ));
}
