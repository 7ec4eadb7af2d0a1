use hostbridge_core::codec;

use crate::commands::parse_payload;
use crate::session::Session;

pub async fn run(session: &Session, command: &str, payload: Option<&str>) -> anyhow::Result<()> {
    let payload = parse_payload(payload)?;
    let response = session.bridge.invoke(command, &payload).await?;
    println!("{}", codec::encode(&response)?);
    Ok(())
}
