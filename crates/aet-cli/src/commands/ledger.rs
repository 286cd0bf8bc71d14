//! `aet ledger` subcommands.

use aet_ledger::Ledger;
use anyhow::Result;
use std::path::Path;

pub fn stats(path: &Path) -> Result<()> {
    let ledger = Ledger::open(path)?;
    println!("ledger_path={}", ledger.path().display());
    println!("total_processed={}", ledger.stats().total_processed);
    Ok(())
}

pub fn check(path: &Path, key: &str) -> Result<()> {
    let ledger = Ledger::open(path)?;
    println!("key={} duplicate={}", key, ledger.contains(key));
    Ok(())
}

pub fn list(path: &Path) -> Result<()> {
    let ledger = Ledger::open(path)?;
    for key in ledger.keys() {
        println!("{key}");
    }
    Ok(())
}

pub fn clear(path: &Path, yes: bool) -> Result<()> {
    let mut ledger = Ledger::open(path)?;
    let n = ledger.len();
    if !yes {
        anyhow::bail!(
            "REFUSING CLEAR: {} recorded key(s) would become submittable again. Re-run with: `aet ledger clear --yes`",
            n
        );
    }
    ledger.clear()?;
    println!("cleared=true removed={n}");
    Ok(())
}
