/*
[INPUT]:  TASKDECK_URL, TASKDECK_API_KEY, TASKDECK_EMAIL, TASKDECK_PASSWORD
[OUTPUT]: Current task rows followed by live change events
[POS]:    Examples - sign in, list and follow the task table
[UPDATE]: When auth, rest or realtime APIs change
*/

use std::env;

use taskdeck_adapter::*;
use tokio::time::{Duration, timeout};

/// Example: sign in, print the task table, then follow changes for a minute
#[tokio::main]
async fn main() -> Result<()> {
    println!("=== taskdeck live tasks example ===\n");

    let url = env_var("TASKDECK_URL")?;
    let api_key = env_var("TASKDECK_API_KEY")?;
    let client = BackendClient::new(&url, api_key)?;

    let auth = AuthClient::new(client.clone());
    let session = auth
        .sign_in_with_password(&env_var("TASKDECK_EMAIL")?, &env_var("TASKDECK_PASSWORD")?)
        .await?;
    println!("signed in as {}", session.email().unwrap_or("?"));

    let table = TaskTable::new(client.clone(), "tasks");
    for task in table.list().await? {
        println!("#{} {} | {}", task.id, task.title, task.description);
    }

    let realtime = RealtimeClient::new(client);
    let mut live = realtime.subscribe(table.table()).await?;
    println!("\nfollowing {} for 60s...", live.table());

    while let Ok(Some(event)) = timeout(Duration::from_secs(60), live.recv()).await {
        match event {
            ChangeEvent::Insert(task) => println!("+ #{} {}", task.id, task.title),
            ChangeEvent::Update(task) => println!("~ #{} {}", task.id, task.title),
            ChangeEvent::Delete { id } => println!("- #{id}"),
        }
    }

    live.close().await?;
    auth.sign_out().await?;
    Ok(())
}

fn env_var(key: &str) -> Result<String> {
    env::var(key).map_err(|_| BackendError::Config(format!("{key} is not set")))
}
