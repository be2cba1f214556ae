use avatar_realtime::types::{ServerEvent, SessionConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv_override().ok();
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let token = std::env::var("AVATAR_SESSION_TOKEN").expect("AVATAR_SESSION_TOKEN must be set");
    let mut client = avatar_realtime::connect(&token).await.expect("failed to connect");

    let mut server_events = client.server_events().await.expect("failed to get server events");

    println!("Connected to the avatar realtime API");
    client
        .start_session(SessionConfig::default())
        .await
        .expect("failed to start session");

    let mut session_id = None;
    while let Ok(e) = server_events.recv().await {
        match e {
            ServerEvent::SessionCreated(data) => {
                println!("session created: {}", data.session().session_id());
                session_id = Some(data.session().session_id().to_string());
            }
            ServerEvent::StreamReady(data) => {
                println!("stream ready: {:?}", data.media().map(|m| m.url()));
                if let Some(session_id) = &session_id {
                    client
                        .speak(session_id, "hola, esta es una prueba")
                        .await
                        .expect("failed to speak");
                }
            }
            ServerEvent::TaskFinished(_) => break,
            ServerEvent::Close { reason } => {
                println!("connection closed: {:?}", reason);
                break;
            }
            e => println!("{:?}", e),
        }
    }

    if let Some(session_id) = &session_id {
        client.stop_session(session_id).await.expect("failed to stop session");
    }
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
}
