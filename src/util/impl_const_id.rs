// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0

/// A simple const generics substitute.
#[macro_export]
macro_rules! impl_const_id {
    (
        $visibility:vis $trait:ident => $id_ty:ty;
        $(
            $iocty:ty = $val:expr
        ),* $(,)*
    ) => {
        $visibility trait $trait {
            const ID: $id_ty;
        }

        $(
            impl $trait for $iocty {
                const ID: $id_ty = $val;
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    struct A;
    struct B;

    impl_const_id! {
        Id => u32;
        A = 1,
        B = 8,
    }

    #[test]
    fn ids() {
        assert_eq!(A::ID, 1);
        assert_eq!(B::ID, 8);
    }
}
