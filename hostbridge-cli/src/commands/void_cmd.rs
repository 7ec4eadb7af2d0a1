use crate::commands::parse_payload;
use crate::session::Session;

pub async fn run(session: &Session, command: &str, payload: Option<&str>) -> anyhow::Result<()> {
    let payload = parse_payload(payload)?;
    session.bridge.invoke_void(command, &payload).await?;
    println!("ok");
    Ok(())
}
