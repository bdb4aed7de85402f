use std::env;

fn main() {
    let version =
        env::var("IMAGEBATCH_VERSION").unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rustc-env=IMAGEBATCH_VERSION={version}");
    println!("cargo:rerun-if-env-changed=IMAGEBATCH_VERSION");
}
