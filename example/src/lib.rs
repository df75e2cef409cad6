//! Types generated from `proto/` at build time, one module per file.
//! The modules are siblings, so cross-file references resolve through `super::`.

pub mod common {
    include!(concat!(env!("OUT_DIR"), "/generated/common.g.rs"));
}

pub mod controller {
    include!(concat!(env!("OUT_DIR"), "/generated/controller.g.rs"));
}

pub mod user {
    include!(concat!(env!("OUT_DIR"), "/generated/user.g.rs"));
}
