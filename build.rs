fn main() {
    #[cfg(windows)]
    {
        use std::env;
        use std::path::PathBuf;

        let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
        let ico_path = PathBuf::from(&manifest_dir)
            .join("resources")
            .join("app-icon.ico");

        if ico_path.exists() {
            let mut res = winres::WindowsResource::new();
            res.set_icon(ico_path.to_str().unwrap());

            if let Err(e) = res.compile() {
                println!("cargo:warning=Failed to compile resources: {}", e);
            }
        } else {
            println!(
                "cargo:warning=Icon file not found at {}. Building without an embedded icon.",
                ico_path.display()
            );
        }
    }
}
