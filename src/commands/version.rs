use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("strmsync version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
