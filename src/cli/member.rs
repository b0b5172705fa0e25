use super::{MemberCommand, Session};

/// Register, remove or list members
///
/// Addresses are validated and encrypted before they reach the registry
/// file; they are never printed back.
pub fn execute(session: &Session, action: MemberCommand) -> Result<(), Box<dyn std::error::Error>> {
    let engine = session.open_engine()?;

    match action {
        MemberCommand::Set { name, address } => {
            let existed = engine.registry().contains(&name);
            engine.register_or_update(&name, &address)?;
            if existed {
                println!("Updated address for {}", name);
            } else {
                println!("Registered {}", name);
            }
        }
        MemberCommand::Delete { name } => {
            engine.remove(&name)?;
            println!("Removed {}", name);
        }
        MemberCommand::List => {
            let members = engine.list_members();
            if members.is_empty() {
                println!("No members registered.");
            }
            for name in members {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
