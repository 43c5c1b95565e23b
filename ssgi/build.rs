use std::error::Error;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::{env, process};

fn main() -> Result<(), Box<dyn Error>> {
    let profile = env::var("PROFILE")?;

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../ssgi-gpu/src");
    println!("cargo:rerun-if-changed=../ssgi-shaders/src");
    println!("cargo:rerun-if-changed=../ssgi-shader-builder/Cargo.toml");
    println!("cargo:rerun-if-changed=../ssgi-shader-builder/src/main.rs");

    let mut dir = PathBuf::from(env::var_os("OUT_DIR").ok_or("missing OUT_DIR")?);

    // Strip `$profile/build/*/out`, so that the shaders get compiled next to
    // the host's artifacts.
    let ok = dir.ends_with("out")
        && dir.pop()
        && dir.pop()
        && dir.ends_with("build")
        && dir.pop()
        && dir.ends_with(&profile)
        && dir.pop();

    assert!(ok, "unexpected OUT_DIR layout");

    let dir = dir.join("shader-builder");

    let status = Command::new("cargo")
        .args(["run", "--release", "-p", "ssgi-shader-builder", "--target-dir"])
        .arg(dir)
        .env_remove("CARGO_ENCODED_RUSTFLAGS")
        .stderr(Stdio::inherit())
        .stdout(Stdio::inherit())
        .status()?;

    if !status.success() {
        process::exit(status.code().unwrap_or(1));
    }

    Ok(())
}
