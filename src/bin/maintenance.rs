use std::env;

use anyhow::{anyhow, bail, Context, Result};
use diesel::prelude::*;
use uuid::Uuid;

use ucc_care::{
    auth::password,
    config::AppConfig,
    db,
    domain::{Role, UserStatus},
    models::NewUser,
    routes::auth::normalize_email,
    schema::users,
};

const USAGE: &str = "Usage:
  maintenance create-user <email> <password> <role> <first-name> <last-name>
  maintenance hash-password <password>";

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("create-user") => create_user(&args[1..])?,
        Some("hash-password") => {
            let plain = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
            println!("{}", password::hash_password(plain)?);
        }
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn create_user(args: &[String]) -> Result<()> {
    let [email, plain, role, first_name, last_name] = args else {
        bail!(USAGE);
    };
    let role: Role = role.parse()?;
    let Some(email) = normalize_email(Some(email.clone())) else {
        bail!("email must not be empty");
    };
    if plain.is_empty() {
        bail!("password must not be empty");
    }

    let config = AppConfig::from_env()?;
    let pool = db::init_pool(&config.database_url)?;
    db::run_migrations(&pool)?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let user = NewUser {
        id: Uuid::new_v4(),
        email: email.clone(),
        password_hash: password::hash_password(plain)?,
        role: role.as_str().to_string(),
        status: UserStatus::Active.as_str().to_string(),
        first_name: first_name.trim().to_string(),
        last_name: last_name.trim().to_string(),
        email_verified: true,
    };

    diesel::insert_into(users::table)
        .values(&user)
        .execute(&mut conn)
        .with_context(|| format!("failed to create user {email}"))?;

    println!("Created {role} {email} ({})", user.id);
    Ok(())
}
