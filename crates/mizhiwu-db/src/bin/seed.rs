//! # Seed Data Generator
//!
//! Populates a development database: a staff account, the goods catalogue,
//! a batch of money codes and invite codes owned by the staff account.
//!
//! ## Usage
//! ```bash
//! # Defaults: ./mizhiwu.db, 10 money codes worth 50.00
//! cargo run -p mizhiwu-db --bin seed
//!
//! # Custom database and batch
//! cargo run -p mizhiwu-db --bin seed -- --db ./data/dev.db --codes 25 --value 100
//! ```
//!
//! Generated codes are printed so they can be pasted into the portal.

use std::env;

use mizhiwu_core::{
    Money, NewUser, DEFAULT_BASE_PORT, DEFAULT_INVITECODE_NUM, INVITE_CODE_LENGTH, SS_PASSWORD_LENGTH,
};
use mizhiwu_db::password::hash_password;
use mizhiwu_db::token::random_token;
use mizhiwu_db::{Database, DbConfig};

/// Catalogue: (name, price in units, level, transfer in GB)
const GOODS: &[(&str, i64, i64, i64)] = &[
    ("Starter 10GB", 5, 1, 10),
    ("Standard 50GB", 15, 2, 50),
    ("Pro 200GB", 40, 3, 200),
    ("Unlimited 1TB", 120, 4, 1024),
];

const ADMIN_USERNAME: &str = "admin";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./mizhiwu.db");
    let mut code_count: usize = 10;
    let mut code_value: i64 = 50;
    let mut admin_password = String::from("admin123");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--codes" | "-c" => {
                if i + 1 < args.len() {
                    code_count = args[i + 1].parse().unwrap_or(10);
                    i += 1;
                }
            }
            "--value" | "-v" => {
                if i + 1 < args.len() {
                    code_value = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--admin-password" => {
                if i + 1 < args.len() {
                    admin_password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mizhiwu Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>            Database file path (default: ./mizhiwu.db)");
                println!("  -c, --codes <N>            Money codes to mint (default: 10)");
                println!("  -v, --value <UNITS>        Value of each money code (default: 50)");
                println!("      --admin-password <PW>  Password for the staff account (default: admin123)");
                println!("  -h, --help                 Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Mizhiwu Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Staff account
    let admin = match db.users().get_by_username(ADMIN_USERNAME).await? {
        Some(admin) => {
            println!("⚠ Staff account '{}' already exists, reusing it", ADMIN_USERNAME);
            admin
        }
        None => {
            let admin = db
                .users()
                .insert(
                    &NewUser {
                        username: ADMIN_USERNAME.to_string(),
                        email: "admin@localhost.localdomain".to_string(),
                        password_hash: hash_password(&admin_password)?,
                        is_staff: true,
                        invite_user_id: None,
                        invitecode_num: DEFAULT_INVITECODE_NUM,
                        sspasswd: random_token(SS_PASSWORD_LENGTH),
                    },
                    DEFAULT_BASE_PORT,
                )
                .await?;
            println!("✓ Created staff account '{}' (port {})", admin.username, admin.port);
            admin
        }
    };

    // Catalogue
    if db.goods().list().await?.is_empty() {
        for (name, price, level, transfer) in GOODS {
            db.goods()
                .insert(name, Money::from_units(*price), *level, *transfer)
                .await?;
        }
        println!("✓ Added {} goods", GOODS.len());
    } else {
        println!("⚠ Catalogue already populated, skipping goods");
    }

    // Money codes
    println!();
    println!("Money codes ({} each):", Money::from_units(code_value));
    for _ in 0..code_count {
        let code = random_token(INVITE_CODE_LENGTH);
        if let Err(e) = db.money_codes().insert(&code, Money::from_units(code_value)).await {
            eprintln!("Failed to mint money code: {}", e);
            continue;
        }
        println!("  {}", code);
    }

    // Invite codes
    println!();
    println!("Invite codes (owner: {}):", admin.username);
    for _ in 0..3 {
        let code = random_token(INVITE_CODE_LENGTH);
        if let Err(e) = db.invite_codes().insert(&code, Some(admin.id)).await {
            eprintln!("Failed to create invite code: {}", e);
            continue;
        }
        println!("  {}", code);
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
