use crate::context::AppContext;
use crate::error::CliError;

pub async fn run_login(context: &AppContext, email: &str, password: &str) -> Result<(), CliError> {
    let session = context.session("login")?;
    let login = context.auth_client().login(email, password).await?;
    let user = session.sign_in(&login, email).await?;
    println!("Signed in as {} ({})", user.name, user.user_id);
    Ok(())
}

pub async fn run_register(
    context: &AppContext,
    name: &str,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    context.auth_client().register(name, email, password).await?;
    println!("Registered {email}. Run `storybox login` to sign in.");
    Ok(())
}

pub async fn run_logout(context: &AppContext) -> Result<(), CliError> {
    if context.session("logout")?.sign_out().await? {
        println!("Signed out");
    } else {
        println!("Not signed in");
    }
    Ok(())
}

pub async fn run_whoami(context: &AppContext) -> Result<(), CliError> {
    let session = context.session("whoami")?;
    if session.access_token().await?.is_none() {
        return Err(CliError::NotSignedIn);
    }
    match session.current_user().await? {
        Some(user) => {
            let email = user.email.as_deref().unwrap_or("(no email)");
            println!("{} <{email}> id={}", user.name, user.user_id);
        }
        None => println!("Signed in (no cached profile)"),
    }
    Ok(())
}
