use crate::page_range::PageSet;
use anyhow::Result;

pub fn run(expression: &str, total: Option<u32>) -> Result<()> {
    let pages = PageSet::parse(expression)?;

    if let Some(total) = total {
        pages.validate(total)?;
    }

    let list: Vec<String> = pages.iter().map(|p| p.to_string()).collect();
    println!("{}", list.join(","));
    println!("\n{} page(s) selected.", pages.len());

    Ok(())
}
