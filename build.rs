// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");

    // Host builds (tests, docs) need no linker script.
    if env::var_os("CARGO_FEATURE_BOARD").is_none() {
        return;
    }

    // Put memory.x where the cortex-m-rt link.x script can find it.
    let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    if let Err(e) = fs::copy("memory.x", out.join("memory.x")) {
        println!("cargo:warning=Failed to copy memory.x: {}", e);
    }
    println!("cargo:rustc-link-search={}", out.display());

    if env::var_os("CARGO_FEATURE_DEFMT").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
}
