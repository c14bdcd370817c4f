//! Print a bcrypt hash for the admin password, ready for `.env`.

use bcrypt::{hash, DEFAULT_COST};
use std::env;

fn main() {
    let Some(password) = env::args().nth(1).filter(|p| !p.is_empty()) else {
        eprintln!("Usage: hash-password <PASSWORD>");
        std::process::exit(1);
    };

    match hash(&password, DEFAULT_COST) {
        Ok(hashed) => {
            println!("# bcrypt, cost {DEFAULT_COST}. Paste this into your .env:");
            println!("ADMIN_PASSWORD_HASH={hashed}");
        }
        Err(e) => {
            eprintln!("Error hashing password: {e}");
            std::process::exit(1);
        }
    }
}
