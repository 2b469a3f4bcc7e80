use crate::observe::TracingObserver;
use crate::pdf::stamp::StampOptions;
use crate::sink::InlineSink;
use crate::stamper::Stamper;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    text: &str,
    pages: &str,
    output: Q,
    options: &StampOptions,
) -> Result<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    let stamper = Stamper::new(Arc::new(InlineSink), options.clone())
        .with_observer(Arc::new(TracingObserver));

    let source =
        std::fs::read(input).with_context(|| format!("Failed to read PDF: {}", input.display()))?;
    let stamped = stamper
        .stamp_bytes(&source, text, pages)
        .with_context(|| format!("Failed to stamp {}", input.display()))?;

    std::fs::write(output, &stamped.bytes)
        .with_context(|| format!("Failed to save PDF: {}", output.display()))?;

    println!(
        "Stamped {} of {} page(s) into {}",
        stamped.pages.len(),
        stamped.page_count,
        output.display()
    );

    Ok(())
}
