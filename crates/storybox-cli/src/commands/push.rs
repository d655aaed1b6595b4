use storybox_core::push::PushState;
use storybox_core::BestEffort;

use crate::cli::PushCommands;
use crate::context::AppContext;
use crate::error::CliError;
use crate::platform::load_subscription_file;

pub async fn run_push(context: &AppContext, command: PushCommands) -> Result<(), CliError> {
    match command {
        PushCommands::Status => {
            let manager = context.push_manager(None).await?;
            println!("{}", describe_state(&manager.state().await?));
        }
        PushCommands::Subscribe { subscription } => {
            let pending = load_subscription_file(&subscription)?;
            let manager = context.push_manager(Some(pending)).await?;
            let outcome = manager.subscribe().await?;
            if outcome.created {
                println!("Subscribed: {}", outcome.record.endpoint);
            } else {
                println!("Already subscribed: {}", outcome.record.endpoint);
            }
            print_remote("registration", &outcome.remote);
        }
        PushCommands::Unsubscribe => {
            let manager = context.push_manager(None).await?;
            let outcome = manager.unsubscribe().await?;
            match outcome.removed {
                Some(record) => println!("Unsubscribed: {}", record.endpoint),
                None => println!("Not subscribed"),
            }
            print_remote("deregistration", &outcome.remote);
        }
        PushCommands::Resubscribe => {
            let manager = context.push_manager(None).await?;
            println!("{}", describe_state(&manager.resubscribe().await?));
        }
    }
    Ok(())
}

pub fn describe_state(state: &PushState) -> String {
    match state {
        PushState::Unsupported => "Push notifications are not supported".to_string(),
        PushState::Unsubscribed => "Not subscribed".to_string(),
        PushState::Subscribed(record) => format!("Subscribed: {}", record.endpoint),
    }
}

fn print_remote(action: &str, outcome: &BestEffort) {
    if let BestEffort::Warn(reason) = outcome {
        eprintln!("Warning: server {action} failed ({reason}); local state kept");
    }
}
