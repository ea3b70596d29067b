use anyhow::Result;

fn main() -> Result<()> {
    syssweep::cli::run()
}
