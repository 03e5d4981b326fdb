//! Board server tests over real sockets

use std::net::SocketAddr;
use tandem_board::{Board, BoardError, BoardServer, TcpBoard};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn start(dir: &TempDir) -> (SocketAddr, std::path::PathBuf) {
    let path = dir.path().join("chat.txt");
    let server = BoardServer::bind("127.0.0.1:0", &path).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    (addr, path)
}

async fn raw(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_bind_creates_missing_file() {
    let dir = TempDir::new().unwrap();
    let (addr, path) = start(&dir).await;

    assert!(path.exists());
    assert_eq!(raw(addr, "VIEW\n").await, "OK 0\n.\n");
}

#[tokio::test]
async fn test_post_then_view() {
    let dir = TempDir::new().unwrap();
    let (addr, path) = start(&dir).await;
    let board = TcpBoard::new(addr.to_string());

    board.post("19 Oct 10:00 AM alice: hi").await.unwrap();
    board.post("19 Oct 10:01 AM bob: hello").await.unwrap();

    let content = board.view(None).await.unwrap();
    assert_eq!(
        content,
        "19 Oct 10:00 AM alice: hi\n19 Oct 10:01 AM bob: hello\n"
    );
    assert_eq!(std::fs::read_to_string(&path).unwrap(), content);

    let response = raw(addr, "VIEW\r\n").await;
    assert_eq!(response, format!("OK {}\n{}.\n", content.len(), content));
}

#[tokio::test]
async fn test_view_last_entries() {
    let dir = TempDir::new().unwrap();
    let (addr, _) = start(&dir).await;
    let board = TcpBoard::new(addr.to_string());

    for i in 1..=5 {
        board.post(&format!("entry {}", i)).await.unwrap();
    }

    assert_eq!(board.view(Some(2)).await.unwrap(), "entry 4\nentry 5\n");
    assert_eq!(board.view(Some(0)).await.unwrap(), "");
    assert_eq!(board.view(Some(50)).await.unwrap().lines().count(), 5);
    assert_eq!(raw(addr, "VIEW -n 1\n").await, "OK 8\nentry 5\n.\n");
}

#[tokio::test]
async fn test_bad_commands() {
    let dir = TempDir::new().unwrap();
    let (addr, path) = start(&dir).await;

    assert_eq!(raw(addr, "DELETE everything\n").await, "ERR badcmd\n");
    assert_eq!(raw(addr, "POST\n").await, "ERR badcmd\n");
    assert_eq!(raw(addr, "VIEW -n many\n").await, "ERR badcmd\n");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
}

#[tokio::test]
async fn test_unwritable_board_reports_open_error() {
    let dir = TempDir::new().unwrap();
    let (addr, path) = start(&dir).await;

    // Replace the file with a directory so every open fails.
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let board = TcpBoard::new(addr.to_string());
    match board.post("lost").await {
        Err(BoardError::Server(code)) => assert_eq!(code, "open"),
        other => panic!("expected ERR open, got {:?}", other),
    }
    assert_eq!(raw(addr, "VIEW\n").await, "ERR open\n");
}

#[tokio::test]
async fn test_concurrent_posts_stay_whole() {
    let dir = TempDir::new().unwrap();
    let (addr, path) = start(&dir).await;

    let mut tasks = Vec::new();
    for writer in 0..4 {
        let board = TcpBoard::new(addr.to_string());
        tasks.push(tokio::spawn(async move {
            for i in 0..25 {
                board
                    .post(&format!("writer {} line {}", writer, i))
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 100);
    assert!(lines.iter().all(|l| l.starts_with("writer ")));
}
