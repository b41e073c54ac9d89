use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn test_order_payment_flow() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "op, actor, target, amount, arg").unwrap();
    writeln!(file, "account, 9, , , admin").unwrap();
    writeln!(file, "account, 1, , , customer").unwrap();
    writeln!(file, "credit, 9, 1, 200.0, topup").unwrap();
    writeln!(file, "order, 1, 10, , shop.example").unwrap();
    writeln!(file, "approve, 9, 10, 150.0,").unwrap();
    writeln!(file, "pay, 1, 10, ,").unwrap();

    let mut cmd = Command::new(cargo_bin!("parcelflow"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("wallet,1,50.00"))
        .stdout(predicate::str::contains("order,10,ORDERING"));
}

#[test]
fn test_insufficient_funds_is_reported_and_harmless() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "op, actor, target, amount, arg").unwrap();
    writeln!(file, "account, 9, , , admin").unwrap();
    writeln!(file, "account, 1, , , customer").unwrap();
    writeln!(file, "credit, 9, 1, 100.0, topup").unwrap();
    writeln!(file, "order, 1, 10, , shop.example").unwrap();
    writeln!(file, "approve, 9, 10, 150.0,").unwrap();
    writeln!(file, "pay, 1, 10, ,").unwrap();

    let mut cmd = Command::new(cargo_bin!("parcelflow"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error processing operation"))
        .stdout(predicate::str::contains("wallet,1,100.00"))
        .stdout(predicate::str::contains("order,10,AWAITING_PAYMENT"));
}

#[test]
fn test_customs_flow() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "op, actor, target, amount, arg").unwrap();
    writeln!(file, "account, 9, , , admin").unwrap();
    writeln!(file, "account, 1, , , customer").unwrap();
    writeln!(file, "credit, 9, 1, 100.0, topup").unwrap();
    writeln!(file, "package, 9, 20, , 1").unwrap();
    writeln!(file, "customs_fee, 9, 20, 30.0,").unwrap();
    writeln!(file, "advance, 9, 20, , PREPARING").unwrap();
    writeln!(file, "advance, 9, 20, , DELIVERING_TO_SHOP").unwrap();
    // Blocked: customs still outstanding.
    writeln!(file, "advance, 9, 20, , IN_SHOP").unwrap();
    writeln!(file, "pay_customs, 1, 20, 30.0,").unwrap();
    writeln!(file, "advance, 9, 20, , IN_SHOP").unwrap();

    let mut cmd = Command::new(cargo_bin!("parcelflow"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error processing operation"))
        .stdout(predicate::str::contains("wallet,1,70.00"))
        .stdout(predicate::str::contains("package,20,IN_SHOP"));
}

#[test]
fn test_refund_restores_balance() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "op, actor, target, amount, arg").unwrap();
    writeln!(file, "account, 9, , , admin").unwrap();
    writeln!(file, "account, 1, , , customer").unwrap();
    writeln!(file, "credit, 9, 1, 200.0, topup").unwrap();
    writeln!(file, "order, 1, 10, , shop.example").unwrap();
    writeln!(file, "approve, 9, 10, 150.0,").unwrap();
    writeln!(file, "pay, 1, 10, ,").unwrap();
    writeln!(file, "cancel, 9, 10, ,").unwrap();

    let mut cmd = Command::new(cargo_bin!("parcelflow"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("wallet,1,200.00"))
        .stdout(predicate::str::contains("order,10,CANCELLED"));
}

#[test]
fn test_malformed_rows_are_skipped() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "op, actor, target, amount, arg").unwrap();
    writeln!(file, "account, 1, , , customer").unwrap();
    writeln!(file, "teleport, 1, , ,").unwrap();
    writeln!(file, "order, 1, 10, , shop.example").unwrap();

    let mut cmd = Command::new(cargo_bin!("parcelflow"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading operation"))
        .stdout(predicate::str::contains("order,10,PENDING_APPROVAL"));
}
