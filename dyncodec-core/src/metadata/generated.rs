//! Wire types of `cosmos.base.reflection.v2alpha1`.
//!
//! Regenerate with `cargo run --bin generate-app-reflection-types --features gen-proto`.
#![allow(clippy::all)]

pub mod v2alpha1 {
    include!("generated/cosmos.base.reflection.v2alpha1.rs");
}
