//! Basic posting workflow example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use ledger_core::{
    Approver, Expense, Invoice, Ledger, ManualJournal, MemoryAuditSink, MemoryStore,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🧾 Ledger Core - Basic Posting Example\n");

    let sink = Arc::new(MemoryAuditSink::new());
    let mut ledger = Ledger::with_audit_sink(MemoryStore::new(), sink.clone());

    // 1. Provision the default chart of accounts
    println!("📊 Setting up Chart of Accounts...");
    let accounts = ledger.create_default_chart().await?;
    for account in accounts.values() {
        println!(
            "  ✓ Created account: {} - {} ({:?})",
            account.code, account.name, account.account_type
        );
    }
    println!();

    // 2. Post a manual journal: owner funds the business
    println!("💰 Posting Manual Journal...");
    let opening = ManualJournal::new(
        "MJ-0001".to_string(),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        "Opening funding".to_string(),
        "1000".to_string(),
        "2000".to_string(),
        BigDecimal::from(50000),
    );
    let posted = ledger.post_document(&opening, "alice").await?;
    println!(
        "  ✓ Posted {} ({} lines, debits = credits = {})",
        posted.reference,
        posted.lines.len(),
        posted.total_debits()
    );

    // 3. Post a tax-inclusive invoice
    println!("\n🧾 Posting Invoice...");
    let invoice = Invoice::new(
        "INV-2024-0042".to_string(),
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        "Acme Pty Ltd".to_string(),
        BigDecimal::from(1120),
        BigDecimal::from(120),
    )
    .with_tax_code("VAT12");
    let posted = ledger.post_document(&invoice, "alice").await?;
    for line in &posted.lines {
        println!(
            "  {} {}: debit {} / credit {}",
            line.account_code, line.account_name, line.debit, line.credit
        );
    }

    // 4. Post an approved expense
    println!("\n💸 Posting Expense...");
    let expense = Expense::new(
        "EXP-0007".to_string(),
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        "Office supplies".to_string(),
        BigDecimal::from(500),
        BigDecimal::from(60),
    )
    .approved_by(Approver {
        id: "mgr-1".to_string(),
        approval_limit: BigDecimal::from(1000),
    });
    let posted = ledger.post_document(&expense, "mgr-1").await?;
    println!("  ✓ Posted {} for {}", posted.reference, posted.total_debits());

    // 5. Inspect balances and the audit trail
    println!("\n📈 Account Balances:");
    for account in ledger.list_accounts().await? {
        println!(
            "  {} {}: {}",
            account.code, account.name, account.balance
        );
    }

    println!("\n🔍 Audit Trail:");
    for event in sink.events() {
        println!("  {} -> {} {}", event.action, event.target_type, event.target_id);
    }

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
