use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("ridepay"));
    cmd.arg("tests/fixtures/requests.csv")
        .arg("--methods")
        .arg("tests/fixtures/methods.json")
        .arg("--no-simulation");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "type,reference,success,payment,status,risk,fee,message",
        ))
        // Card charge: 2.9% of 25.50
        .stdout(predicate::str::is_match(
            r"payment,ride-1,true,[0-9a-f-]{36},completed,low,0.74,Payment processed successfully",
        )?)
        .stdout(predicate::str::is_match(
            r"payment,ride-2,true,[0-9a-f-]{36},completed,low,",
        )?)
        // Refund resolves the payment by its reference
        .stdout(predicate::str::is_match(
            r"refund,ride-1,true,[0-9a-f-]{36},completed,,,Refund processed successfully",
        )?)
        // Over the default 5000 limit: rejected before any record exists
        .stdout(predicate::str::contains(
            "payment,ride-3,false,,,,,Invalid payment request",
        ));

    Ok(())
}

#[test]
fn test_cli_unknown_method_label() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(
        &mut csv,
        b"type,reference,user,trip,driver,amount,currency,method,reason\n\
          payment,ride-1,rider-1,trip-1,driver-1,10,USD,nowhere,\n",
    )
    .unwrap();

    Command::new(cargo_bin!("ridepay"))
        .arg(csv.path())
        .arg("--no-simulation")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "payment,ride-1,false,,,,,Payment method not found",
        ));
}

#[test]
fn test_cli_missing_input_fails() {
    Command::new(cargo_bin!("ridepay"))
        .arg("tests/fixtures/does_not_exist.csv")
        .assert()
        .failure();
}
