//! End-to-end streaming sessions against the fake server.

mod common;

use common::*;
use flate2::Compression;
use flate2::write::GzEncoder;
use houndify::audio::wav_header;
use houndify::transport::encode_chunk;
use houndify::{CollectingListener, HoundError, ListenerEvent, SampleRate, StreamingClient};
use serde_json::json;
use std::io::Write;

fn partial(text: &str, safe_to_stop: bool) -> serde_json::Value {
    json!({
        "Format": "SoundHoundVoiceSearchParialTranscript",
        "FormatVersion": "1.0",
        "PartialTranscript": text,
        "SafeToStopAudio": safe_to_stop,
        "Done": false,
    })
}

fn final_result() -> serde_json::Value {
    json!({
        "Format": "SoundHoundVoiceSearchResult",
        "FormatVersion": "1.0",
        "Status": "OK",
        "NumToReturn": 1,
        "AllResults": [{ "WrittenResponse": "It is noon." }],
    })
}

#[tokio::test]
async fn session_streams_frames_and_stops_on_safe_to_stop() {
    let (connector, mut accepted) = fake_server();
    let mut client = StreamingClient::new(credentials(), connector);
    let listener = CollectingListener::new();

    client.start(listener.clone()).await.unwrap();
    let mut server = accepted.recv().await.unwrap();

    let head = read_head(&mut server).await;
    assert_eq!(head.request_line, "POST /v1/audio HTTP/1.1");
    assert_eq!(head.header("Host"), Some(FAKE_HOST));
    assert_eq!(head.header("Transfer-Encoding"), Some("chunked"));
    assert_eq!(head.header("Hound-Response-Accept-Encoding"), Some("gzip"));

    let info = head.request_info();
    assert_eq!(info["PartialTranscriptsDesired"], json!(true));
    assert_eq!(info["ClientID"], json!("test-client"));

    // The client auth header must verify against the request auth header
    let request_auth = head.header("Hound-Request-Authentication").unwrap();
    let request_id = request_auth.strip_prefix("test-user;").unwrap();
    let client_auth = head.header("Hound-Client-Authentication").unwrap();
    let timestamp = client_auth.split(';').nth(1).unwrap();
    let (expected_request, expected_client) =
        credentials().authenticate(request_id, timestamp).unwrap();
    assert_eq!(request_auth, expected_request);
    assert_eq!(client_auth, expected_client);

    assert_eq!(read_chunk(&mut server).await, wav_header(SampleRate::Hz16000).to_vec());

    // 1000 bytes: one 640-byte frame goes out, 360 stay buffered
    let audio: Vec<u8> = (0..1000).map(|i| (i % 251) as u8).collect();
    assert!(!client.fill(&audio).await.unwrap());
    assert_eq!(read_chunk(&mut server).await, audio[..640].to_vec());

    send(&mut server, CHUNKED_HEAD).await;
    send(&mut server, &message_chunk(&partial("what time", true))).await;

    wait_for_stop(&mut client).await;

    // Finished: this audio is dropped rather than sent
    assert!(client.fill(&[7u8; 1280]).await.unwrap());

    let server_task = tokio::spawn(async move {
        let chunks = read_until_terminal(&mut server).await;
        send(&mut server, &message_chunk(&final_result())).await;
        send(&mut server, b"0\r\n\r\n").await;
        chunks
    });

    let result = client.finish().await.unwrap();
    let trailing = server_task.await.unwrap();

    // Only the zero-padded remainder followed the early stop
    let mut padded = audio[640..].to_vec();
    padded.resize(640, 0);
    assert_eq!(trailing, vec![padded]);

    assert_eq!(result, Some(final_result()));
    assert_eq!(
        listener.events(),
        vec![
            ListenerEvent::PartialTranscript("what time".to_string()),
            ListenerEvent::FinalResponse(final_result()),
        ]
    );
    assert!(!client.is_active());
}

#[tokio::test]
async fn disabled_vad_keeps_uploading_after_safe_to_stop() {
    let (connector, mut accepted) = fake_server();
    let mut client = StreamingClient::new(credentials(), connector).with_vad(false);
    let listener = CollectingListener::new();

    client.start(listener.clone()).await.unwrap();
    let mut server = accepted.recv().await.unwrap();
    read_head(&mut server).await;
    read_chunk(&mut server).await;

    send(&mut server, CHUNKED_HEAD).await;
    send(&mut server, &message_chunk(&partial("stop now", true))).await;
    let probe = listener.clone();
    eventually(|| {
        let probe = probe.clone();
        async move { !probe.transcripts().is_empty() }
    })
    .await;

    assert!(!client.fill(&[1u8; 640]).await.unwrap());
    assert_eq!(read_chunk(&mut server).await, vec![1u8; 640]);

    let server_task = tokio::spawn(async move {
        read_until_terminal(&mut server).await;
        send(&mut server, &message_chunk(&final_result())).await;
    });
    assert_eq!(client.finish().await.unwrap(), Some(final_result()));
    server_task.await.unwrap();
}

#[tokio::test]
async fn narrowband_session_uses_8khz_header_and_frames() {
    let (connector, mut accepted) = fake_server();
    let mut client = StreamingClient::new(credentials(), connector);
    client.set_sample_rate(8000).unwrap();

    client.start(houndify::NoopListener).await.unwrap();
    let mut server = accepted.recv().await.unwrap();
    read_head(&mut server).await;
    assert_eq!(read_chunk(&mut server).await, wav_header(SampleRate::Hz8000).to_vec());

    assert!(!client.fill(&[2u8; 700]).await.unwrap());
    assert_eq!(read_chunk(&mut server).await.len(), 320);
    assert_eq!(read_chunk(&mut server).await.len(), 320);

    let server_task = tokio::spawn(async move {
        let trailing = read_until_terminal(&mut server).await;
        send(&mut server, CHUNKED_HEAD).await;
        send(&mut server, &message_chunk(&final_result())).await;
        trailing
    });
    client.finish().await.unwrap();

    let mut padded = vec![2u8; 60];
    padded.resize(320, 0);
    assert_eq!(server_task.await.unwrap(), vec![padded]);
}

#[tokio::test]
async fn gzip_messages_are_decoded() {
    let (connector, mut accepted) = fake_server();
    let mut client = StreamingClient::new(credentials(), connector);
    let listener = CollectingListener::new();

    client.start(listener.clone()).await.unwrap();
    let mut server = accepted.recv().await.unwrap();
    read_head(&mut server).await;

    let server_task = tokio::spawn(async move {
        read_until_terminal(&mut server).await;
        send(&mut server, CHUNKED_HEAD).await;
        for message in [partial("hello", false), final_result()] {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(format!("{}\r\n", message).as_bytes()).unwrap();
            send(&mut server, &encode_chunk(&encoder.finish().unwrap())).await;
        }
    });

    let result = client.finish().await.unwrap();
    server_task.await.unwrap();

    assert_eq!(result, Some(final_result()));
    assert_eq!(listener.transcripts(), vec!["hello"]);
}

#[tokio::test]
async fn server_error_is_the_session_result() {
    let (connector, mut accepted) = fake_server();
    let mut client = StreamingClient::new(credentials(), connector);
    let listener = CollectingListener::new();

    client.start(listener.clone()).await.unwrap();
    let mut server = accepted.recv().await.unwrap();
    read_head(&mut server).await;

    let error = json!({ "Status": "Error", "ErrorMessage": "Authentication failed" });
    let reply = error.clone();
    let server_task = tokio::spawn(async move {
        send(&mut server, CHUNKED_HEAD).await;
        send(&mut server, &message_chunk(&reply)).await;
        send(&mut server, &message_chunk(&partial("too late", false))).await;
        read_until_terminal(&mut server).await;
    });

    wait_for_stop(&mut client).await;
    let result = client.finish().await.unwrap();
    server_task.await.unwrap();

    assert_eq!(result, Some(error.clone()));
    assert_eq!(listener.events(), vec![ListenerEvent::Error(error)]);
}

#[tokio::test]
async fn premature_close_yields_synthetic_error() {
    let (connector, mut accepted) = fake_server();
    let mut client = StreamingClient::new(credentials(), connector);
    let listener = CollectingListener::new();

    client.start(listener.clone()).await.unwrap();
    let mut server = accepted.recv().await.unwrap();
    read_head(&mut server).await;

    let server_task = tokio::spawn(async move {
        read_until_terminal(&mut server).await;
        send(&mut server, b"HTTP/1.1 500 Internal Server Error\r\n\r\nupstream timeout").await;
        drop(server);
    });

    let result = client.finish().await.unwrap();
    server_task.await.unwrap();

    let expected = json!({ "Error": "upstream timeout" });
    assert_eq!(result, Some(expected.clone()));
    assert_eq!(listener.events(), vec![ListenerEvent::Error(expected)]);
}

#[tokio::test]
async fn broken_upload_is_silent_until_finish() {
    let (connector, mut accepted) = fake_server();
    // VAD off: the synthetic error from the closed stream would otherwise stop uploads
    let mut client = StreamingClient::new(credentials(), connector).with_vad(false);

    client.start(houndify::NoopListener).await.unwrap();
    drop(accepted.recv().await.unwrap());

    // Writes now fail; fill must not surface that
    assert!(!client.fill(&[0u8; 6400]).await.unwrap());
    assert!(!client.fill(&[0u8; 6400]).await.unwrap());

    let result = client.finish().await.unwrap();
    assert_eq!(result, Some(json!({ "Error": "" })));
}

#[tokio::test]
async fn overlapping_sessions_are_rejected() {
    let (connector, mut accepted) = fake_server();
    let mut client = StreamingClient::new(credentials(), connector);

    client.start(houndify::NoopListener).await.unwrap();
    let err = client.start(houndify::NoopListener).await.unwrap_err();
    assert!(matches!(err, HoundError::SessionActive));

    let mut server = accepted.recv().await.unwrap();
    let server_task = tokio::spawn(async move {
        read_head(&mut server).await;
        read_until_terminal(&mut server).await;
        send(&mut server, CHUNKED_HEAD).await;
        send(&mut server, &message_chunk(&final_result())).await;
    });
    client.finish().await.unwrap();
    server_task.await.unwrap();

    // A fresh session can start once the previous one finished
    client.start(houndify::NoopListener).await.unwrap();
    assert!(client.is_active());
}

#[tokio::test]
async fn request_info_overrides_reach_the_server() {
    let (connector, mut accepted) = fake_server();
    let mut client = StreamingClient::new(credentials(), connector);
    {
        let info = client.request_info_mut();
        info.set("InputLanguageIETFTag", "de-DE");
        info.set("RequestID", "fixed-request");
        info.set_location(48.13, 11.58);
    }

    client.start(houndify::NoopListener).await.unwrap();
    let mut server = accepted.recv().await.unwrap();
    let head = read_head(&mut server).await;

    assert_eq!(head.header("Hound-Input-Language-IETF-Tag"), Some("de-DE"));
    assert_eq!(
        head.header("Hound-Request-Authentication"),
        Some("test-user;fixed-request")
    );
    let info = head.request_info();
    assert_eq!(info["Latitude"], json!(48.13));
    assert!(info["PositionTime"].is_u64());
}
