pub fn run() -> anyhow::Result<()> {
    println!("parley {}", env!("CARGO_PKG_VERSION"));
    println!("Client-side coordinator for streaming analysis conversations");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_output() {
        let result = run();
        assert!(result.is_ok());
    }
}
