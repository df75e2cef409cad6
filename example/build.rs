use std::{env, path::PathBuf};

use brine_proto_compiler::{compile_dir, Event};

fn main() {
    println!("cargo:rerun-if-changed=proto");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo")).join("generated");
    let summary = compile_dir("proto", &out_dir, |event| {
        if let Event::ParseFailed { file_id, error } | Event::Failed { file_id, error } = event {
            println!("cargo:warning={}: {}", file_id, error);
        }
    })
    .expect("failed to compile proto/");

    if !summary.is_clean() {
        panic!("proto/ did not compile cleanly: {:?}", summary);
    }
}
