//! Tax rate calculation example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use ledger_core::{MemoryStore, TaxRate, TaxRateManager, TaxScope};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧾 Ledger Core - Tax Rates Example\n");

    let mut manager = TaxRateManager::new(MemoryStore::new());
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    // Exclusive percentage rate
    let vat12 = TaxRate::percentage(
        "VAT12".to_string(),
        "VAT 12%".to_string(),
        BigDecimal::from(12),
    )
    .as_default();
    manager.save(&vat12).await?;

    let subtotal = BigDecimal::from(1000);
    println!("VAT 12% (exclusive) on {subtotal}:");
    println!("  tax   = {}", vat12.calculate_tax(&subtotal));
    println!("  total = {}", vat12.calculate_total(&subtotal));

    // Inclusive variant: the stated total already embeds the tax
    let vat12_inc = TaxRate::percentage(
        "VAT12-INC".to_string(),
        "VAT 12% inclusive".to_string(),
        BigDecimal::from(12),
    )
    .inclusive();
    manager.save(&vat12_inc).await?;

    let total = BigDecimal::from(1120);
    println!("\nVAT 12% (inclusive) on a stated total of {total}:");
    println!("  embedded tax = {}", vat12_inc.included_tax(&total));
    println!("  total        = {}", vat12_inc.calculate_total(&total));

    // Fixed amount rate, indifferent to the subtotal
    let stamp = TaxRate::fixed(
        "STAMP".to_string(),
        "Stamp duty".to_string(),
        BigDecimal::new(2550.into(), 2),
    );
    manager.save(&stamp).await?;
    println!("\nStamp duty on 10 and on 100000:");
    println!("  {}", stamp.calculate_tax(&BigDecimal::from(10)));
    println!("  {}", stamp.calculate_tax(&BigDecimal::from(100000)));

    // Effectiveness windows gate rates at query time
    let expired = TaxRate::percentage(
        "OLD18".to_string(),
        "Old VAT 18%".to_string(),
        BigDecimal::from(18),
    )
    .effective_between(None, NaiveDate::from_ymd_opt(2020, 12, 31));
    manager.save(&expired).await?;

    match manager.effective("OLD18", today).await {
        Ok(_) => println!("\nOLD18 is effective"),
        Err(err) => println!("\nOLD18 rejected: {err}"),
    }

    // The sales-scope default is whichever rate was most recently flagged
    let default = manager.default_for(TaxScope::Sales, today).await?;
    println!(
        "Default sales rate: {}",
        default.map(|r| r.code).unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}
