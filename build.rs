use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=GIT_VERSION");

    // 1. Verifica se a revisão foi explicitamente forçada via ambiente (ex: builds de CI)
    let forced = env::var("GIT_VERSION").ok().filter(|v| !v.is_empty());

    // 2. Caso contrário, pergunta ao git (ausente em tarballs, então falha silenciosa)
    let revision = forced.or_else(|| {
        Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .output()
            .ok()
            .filter(|out| out.status.success())
            .and_then(|out| String::from_utf8(out.stdout).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    });

    // Sufixo anexado à versão reportada em retro_get_system_info
    let suffix = revision.map(|r| format!("-{}", r)).unwrap_or_default();
    println!("cargo:rustc-env=PICO_RETRO_GIT_SUFFIX={}", suffix);
}
