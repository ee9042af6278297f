use std::process::Command;

fn main() {
    // Only rebuild CSS when template or CSS files change
    println!("cargo:rerun-if-changed=assets/css/input.css");
    println!("cargo:rerun-if-changed=templates/");

    // Try to run Tailwind CSS standalone CLI
    let status = Command::new("tailwindcss")
        .args([
            "-i",
            "assets/css/input.css",
            "-o",
            "assets/css/output.css",
            "--minify",
        ])
        .status();

    match status {
        Ok(s) if s.success() => {
            println!("cargo:warning=Tailwind CSS compiled successfully");
        }
        _ => {
            // Tailwind CLI not available — create a minimal fallback CSS
            println!("cargo:warning=Tailwind CLI not found, using fallback CSS");
            let fallback = r#"*, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: system-ui, -apple-system, sans-serif; line-height: 1.6; color: #1c1917; background: #fafaf9; -webkit-font-smoothing: antialiased; max-width: 56rem; margin: 0 auto; padding: 1rem; }
a { color: inherit; }
a:hover { opacity: 0.8; }
nav { display: flex; gap: 1rem; padding: 0.75rem 0; border-bottom: 1px solid #e7e5e4; margin-bottom: 1.5rem; }
nav .spacer { margin-left: auto; }
h1 { font-size: 1.5rem; margin-bottom: 1rem; }
h2 { font-size: 1.125rem; margin: 1rem 0 0.5rem; }
form { margin: 0.5rem 0; }
label { display: block; font-size: 0.875rem; color: #57534e; margin-top: 0.5rem; }
input[type="text"], input[type="password"], input[type="number"], textarea, select { width: 100%; padding: 0.5rem; border: 1px solid #d6d3d1; border-radius: 0.5rem; font: inherit; }
button { display: inline-flex; align-items: center; padding: 0.4rem 0.9rem; border-radius: 0.5rem; border: none; background: #1c1917; color: #fff; font-size: 0.875rem; cursor: pointer; }
button:hover { background: #44403c; }
button.secondary { background: #fff; color: #1c1917; border: 1px solid #d6d3d1; }
.card { background: #fff; border: 1px solid #e7e5e4; border-radius: 0.75rem; padding: 1rem 1.25rem; margin-bottom: 0.75rem; box-shadow: 0 1px 2px 0 rgb(0 0 0 / 0.05); }
.meta { font-size: 0.75rem; color: #78716c; }
.flash { padding: 0.5rem 0.75rem; border-radius: 0.5rem; margin-bottom: 1rem; font-size: 0.875rem; }
.flash-success { background: #ecfdf5; color: #065f46; }
.flash-error { background: #fef2f2; color: #991b1b; }
.replies { margin-left: 1.5rem; border-left: 2px solid #e7e5e4; padding-left: 0.75rem; }
.pill { display: inline-block; font-size: 0.75rem; background: #f5f5f4; border-radius: 9999px; padding: 0.1rem 0.6rem; }
.inline { display: inline; }
"#;
            std::fs::create_dir_all("assets/css").ok();
            std::fs::write("assets/css/output.css", fallback).ok();
        }
    }
}
