//! Generates `authsdk.h` from the `extern "C"` surface.
//!
//! The header is written to `OUT_DIR` and its path exported to the crate as
//! `AUTHSDK_HEADER`. Set `AUTHSDK_INCLUDE_DIR` to also copy it somewhere a
//! host build can pick it up.

use std::env;
use std::path::PathBuf;

const HEADER: &str = "authsdk.h";

fn main() {
    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()));
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap_or_else(|_| ".".into()));
    let header = out_dir.join(HEADER);
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-env-changed=AUTHSDK_INCLUDE_DIR");
    println!("cargo:rustc-env=AUTHSDK_HEADER={}", header.display());

    let config = cbindgen::Config {
        language: cbindgen::Language::C,
        include_guard: Some("AUTHSDK_H".into()),
        cpp_compat: true,
        ..Default::default()
    };
    let bindings = match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
    {
        Ok(bindings) => bindings,
        Err(err) => {
            println!("cargo:warning=header not generated: {err}");
            return;
        }
    };
    bindings.write_to_file(&header);
    if let Some(dir) = env::var_os("AUTHSDK_INCLUDE_DIR") {
        bindings.write_to_file(PathBuf::from(dir).join(HEADER));
    }
}
