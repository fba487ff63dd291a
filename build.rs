use std::{env, path::PathBuf, process::Command};

fn compile_ptx(src: &str, out_name: &str, arch: &str) {
    println!("cargo:rerun-if-changed={src}");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));
    let ptx_path = out_dir.join(out_name);

    let status = Command::new("nvcc")
        .args([
            "-ptx",
            "-O3",
            &format!("-arch={arch}"),
            src,
            "-o",
        ])
        .arg(&ptx_path)
        .status()
        .expect("Failed to run nvcc");

    if !status.success() {
        panic!("nvcc failed compiling {src} -> {out_name}");
    }

    println!("cargo:warning=Generated PTX at {}", ptx_path.display());
}

fn main() {
    println!("cargo:rerun-if-env-changed=CUDA_ARCH");

    // PTX is only needed when the device path is compiled in.
    if env::var("CARGO_FEATURE_CUDA").is_err() {
        return;
    }

    let arch = env::var("CUDA_ARCH").unwrap_or_else(|_| "sm_86".to_string());

    compile_ptx("cuda/lt_walk.cu", "lt_walk.ptx", &arch);
    compile_ptx("cuda/ic_frontier.cu", "ic_frontier.ptx", &arch);
}
