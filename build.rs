//! Build script to embed Windows resource metadata into the executable
//! This sets the application name shown in Task Manager and in the task scheduler

fn main() {
    #[cfg(windows)]
    {
        let target = std::env::var("CARGO_BIN_NAME").unwrap_or_default();

        let mut res = winresource::WindowsResource::new();

        res.set("ProductName", "DMMGamePlayer Fast Launcher");
        res.set("CompanyName", "DMMGamePlayer Fast Launcher");
        res.set("LegalCopyright", "Copyright © 2026");
        res.set("ProductVersion", env!("CARGO_PKG_VERSION"));
        res.set("FileVersion", env!("CARGO_PKG_VERSION"));

        match target.as_str() {
            "dgp_fast_launcher" => {
                res.set("FileDescription", "DMMGamePlayerFastLauncher");
                res.set("InternalName", "DMMGamePlayerFastLauncher");
                res.set("OriginalFilename", "dgp_fast_launcher.exe");
            }
            _ => {
                res.set("FileDescription", "DMMGamePlayer Fast Launcher");
                res.set("InternalName", "DMMGamePlayerFastLauncher");
            }
        }

        if let Err(e) = res.compile() {
            eprintln!("Warning: Failed to compile Windows resources: {}", e);
        }
    }
}
