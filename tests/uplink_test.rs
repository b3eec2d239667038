//! Integration tests for the APRS-IS uplink

use rainwx::config::{StationConfig, UplinkConfig};
use rainwx::uplink::{AprsIsClient, UplinkError};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

fn station() -> StationConfig {
    StationConfig {
        callsign: "N0CALL".to_string(),
        ssid: "15".to_string(),
        latitude: 41.88,
        longitude: -87.63,
        ..StationConfig::default()
    }
}

#[tokio::test]
async fn test_send_logs_in_then_writes_packet() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = String::new();
        socket.read_to_string(&mut received).await.unwrap();
        received
    });

    let uplink = UplinkConfig {
        server: addr.to_string(),
        passcode: None,
    };
    let client = AprsIsClient::new(&uplink, &station());
    let packet = "N0CALL-15>APRS,TCPIP*:!4152.80N/08737.80W_.../...g...t...p017";
    client.send(packet).await.expect("send succeeds");

    let received = tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .expect("server finished")
        .unwrap();
    let lines: Vec<&str> = received.split("\r\n").collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("user N0CALL-15 pass 13023 vers rainwx "));
    assert_eq!(lines[1], packet);
    assert_eq!(lines[2], "");
}

#[tokio::test]
async fn test_send_reports_connection_failure() {
    // Bind then drop to get a port nobody is listening on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let uplink = UplinkConfig {
        server: addr.to_string(),
        passcode: Some(1),
    };
    let client = AprsIsClient::new(&uplink, &station()).with_timeout(Duration::from_secs(2));

    let err = client.send("N0CALL-15>APRS:test").await.unwrap_err();
    assert!(matches!(err, UplinkError::Connect { .. }), "{err}");
}
