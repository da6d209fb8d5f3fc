fn main() -> anyhow::Result<()> {
    archiflow::run()?;
    Ok(())
}
