//! Tests for the MS SQL Server driver

use crate::MssqlDriver;
use pwprobe_core::{ConnectionTarget, DatabaseDriver, ProbeError};

#[test]
fn test_driver_metadata() {
    let driver = MssqlDriver::new();
    assert_eq!(driver.id(), "mssql");
    assert_eq!(driver.display_name(), "MS SQL Server");
    assert_eq!(driver.default_port(), 1433);
}

#[tokio::test]
async fn test_connect_to_closed_port_fails_without_panicking() {
    // Bind and drop a listener to get a port nothing is listening on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ConnectionTarget::new("127.0.0.1", port, "sa", "Strong{Pass}2024!", "master")
        .structured_config();

    let err = match MssqlDriver::new().connect(&config).await {
        Ok(_) => panic!("connect to a closed port succeeded"),
        Err(e) => e,
    };
    assert!(matches!(err, ProbeError::Connection(_)));
}

#[tokio::test]
async fn test_semicolon_string_goes_through_driver_connect() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    // Parsed by tiberius, then refused at the TCP layer
    let conn = ConnectionTarget::new("127.0.0.1", port, "sa", "Strong{Pass}2024!", "master")
        .semicolon_string();

    let err = match MssqlDriver::new().connect_str(&conn).await {
        Ok(_) => panic!("connect to a closed port succeeded"),
        Err(e) => e,
    };
    assert!(matches!(err, ProbeError::Connection(_)), "{}", err);
}
