use hostbridge_host::Dispatcher;

pub fn run(dispatcher: &Dispatcher) -> anyhow::Result<()> {
    println!("{} commands:", dispatcher.len());
    for name in dispatcher.commands() {
        println!("  {name}");
    }
    Ok(())
}
