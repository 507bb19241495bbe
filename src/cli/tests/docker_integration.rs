//! Integration test: flatten a real image and rebuild it.
//!
//! Builds a small two-layer image, runs `cfs-gen -c` against it with a
//! stand-in converter that archives each layer directory as base64 text
//! (`ADD` would unpack a plain tar into a directory), then checks that
//! the rebuilt image contains one file per layer in bottom-to-top order and
//! that unpacking those files in order reproduces the original overlay
//! result.
//!
//! ## Prerequisites
//!
//! - `cfs-gen` binary built (`cargo build -p cfs-gen-cli`)
//! - A Docker daemon using the overlay2 storage driver
//! - Read access to `/var/lib/docker` (usually root)
//!
//! ## Running
//!
//! ```bash
//! sudo -E cargo test -p cfs-gen-cli --test docker_integration -- --ignored --nocapture
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

/// Find the cfs-gen binary in the target directory.
fn find_binary() -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let workspace_root = Path::new(manifest_dir)
        .ancestors()
        .nth(2)
        .expect("cli crate should be inside workspace");

    for profile in ["debug", "release"] {
        let bin = workspace_root.join("target").join(profile).join("cfs-gen");
        if bin.exists() {
            return bin.to_string_lossy().to_string();
        }
    }

    "cfs-gen".to_string()
}

fn docker(args: &[&str]) -> (String, bool) {
    eprintln!("    $ docker {}", args.join(" "));
    let output = Command::new("docker")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run `docker {}`: {}", args.join(" "), e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        output.status.success(),
    )
}

/// Converter stand-in: tars `-dir=` into `-o=`, base64-encoded.
fn write_converter(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("tar-converter.sh");
    std::fs::write(
        &path,
        "#!/bin/sh\n\
         for a in \"$@\"; do\n\
           case \"$a\" in\n\
             -dir=*) src=\"${a#-dir=}\" ;;\n\
             -o=*) out=\"${a#-o=}\" ;;\n\
           esac\n\
         done\n\
         tar -C \"$src\" -cf - . | base64 > \"$out\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
#[ignore]
fn test_custom_build_round_trip() {
    let tmp = tempfile::TempDir::new().unwrap();
    let context = tmp.path().join("ctx");
    std::fs::create_dir(&context).unwrap();
    std::fs::write(context.join("first.txt"), "first\n").unwrap();
    std::fs::write(context.join("second.txt"), "second\n").unwrap();
    std::fs::write(
        context.join("Dockerfile"),
        "FROM scratch\nCOPY first.txt /data.txt\nCOPY second.txt /data.txt\nCMD [\"/data.txt\"]\n",
    )
    .unwrap();

    let converter = write_converter(tmp.path());
    let work_root = tmp.path().join("work");
    std::fs::create_dir(&work_root).unwrap();

    let output = Command::new(find_binary())
        .args(["-c", "cfs-gen-it", context.to_str().unwrap()])
        .args(["--converter", converter.to_str().unwrap()])
        .args(["--work-root", work_root.to_str().unwrap()])
        .output()
        .expect("failed to run cfs-gen");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "cfs-gen failed: {stderr}");

    let recipe = std::fs::read_to_string(work_root.join("init-cfs-gen-it").join("Dockerfile"))
        .expect("recipe should be left in the working directory");
    let lines: Vec<&str> = recipe.lines().collect();
    assert_eq!(lines[0], "FROM scratch");
    assert_eq!(lines.last(), Some(&"CMD [\"/data.txt\"]"));
    let adds: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with("ADD ")).collect();
    for (i, line) in adds.iter().enumerate() {
        assert!(line.ends_with(&format!(" /{i}.img")), "unexpected directive {line}");
    }

    // Unpack every ordinal file in order; the last writer must win.
    let (container, ok) = docker(&["create", "cfs-gen-it"]);
    assert!(ok);
    let container = container.trim().to_string();
    let extract = tmp.path().join("extract");
    let merged = tmp.path().join("merged");
    std::fs::create_dir(&extract).unwrap();
    std::fs::create_dir(&merged).unwrap();
    for i in 0..adds.len() {
        let dest = extract.join(format!("{i}.img"));
        let archive = extract.join(format!("{i}.tar"));
        let (_, ok) = docker(&[
            "cp",
            &format!("{container}:/{i}.img"),
            dest.to_str().unwrap(),
        ]);
        assert!(ok);
        assert!(dest.is_file(), "/{i}.img should be a regular file");
        let status = Command::new("sh")
            .arg("-c")
            .arg(format!(
                "base64 -d '{}' > '{}'",
                dest.display(),
                archive.display()
            ))
            .status()
            .unwrap();
        assert!(status.success());
        let status = Command::new("tar")
            .args(["-C", merged.to_str().unwrap(), "-xf", archive.to_str().unwrap()])
            .status()
            .unwrap();
        assert!(status.success());
    }
    assert_eq!(
        std::fs::read_to_string(merged.join("data.txt")).unwrap(),
        "second\n"
    );

    docker(&["rm", &container]);
    docker(&["rmi", "cfs-gen-it", "init-cfs-gen-it"]);
}
