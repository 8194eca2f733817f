use crate::error::Result;

pub fn run() -> Result<()> {
    print!("{}", listing());
    Ok(())
}

/// One line per family, followed by its indented class names.
fn listing() -> String {
    let mut out = String::new();
    for (family, classes) in lmpib::registered_classes() {
        out.push_str(&format!("{family}:\n"));
        for class in classes {
            out.push_str(&format!("  {class}\n"));
        }
    }
    out
}
