fn main() {
    // Prefer pkg-config: it knows the install prefix and emits the full set
    // of link flags, including Ipopt's linear-solver dependencies.
    if pkg_config::probe_library("ipopt").is_ok() {
        return;
    }

    // Fallback for installs without a .pc file: search the usual prefixes
    // and link the library by name.
    println!("cargo:rustc-link-search=native=/usr/local/lib");
    println!("cargo:rustc-link-search=native=/opt/homebrew/lib");
    println!("cargo:rustc-link-lib=ipopt");

    // IPOPT is a C++ library, so it depends on the C++ standard library:
    // libc++ on macOS, libstdc++ elsewhere.
    if cfg!(target_os = "macos") {
        println!("cargo:rustc-link-lib=c++");
    } else {
        println!("cargo:rustc-link-lib=stdc++");
    }
}
