use crate::session::Session;

pub async fn run(session: &Session, command: &str, text: Option<&str>) -> anyhow::Result<()> {
    let response = session.bridge.invoke_text(command, text.unwrap_or("")).await?;
    println!("{response}");
    Ok(())
}
