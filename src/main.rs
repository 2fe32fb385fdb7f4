//! Minimal operator CLI for the cookie secret store. Commands are
//! intentionally small and auditable so operators can see exactly how key
//! material is handled; output only ever contains key fingerprints.

use std::env;
use std::path::Path;
use std::process;

use cookie_keystore::keys::store;
use cookie_keystore::keys::CodecList;
use cookie_keystore::repo::Repo;
use serde_json::json;

fn print_usage() {
    eprintln!("Commands:\n  init <data-dir>    create the cookie secret file if missing and print its summary\n  status <data-dir>  print the records of an existing cookie secret file\n  rotate <data-dir>  append a freshly generated key pair to the secret file");
}

fn print_summary(secret_path: &Path, codecs: &CodecList) {
    let summary = json!({
        "path": secret_path.display().to_string(),
        "records": codecs.len(),
        "keys": codecs.describe(),
    });
    println!("{}", serde_json::to_string_pretty(&summary).unwrap());
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        print_usage();
        process::exit(2);
    }

    let repo = Repo::new(&args[2]);
    let secret_path = store::secret_file_path(&repo);

    let result = match args[1].as_str() {
        "init" => store::load_or_create(&repo),
        "status" => store::load(&secret_path),
        "rotate" => store::rotate(&secret_path),
        _ => {
            print_usage();
            process::exit(2);
        }
    };

    match result {
        Ok(codecs) => {
            if codecs.is_empty() {
                eprintln!(
                    "cookie secret file {} holds no key records; refusing to use it",
                    secret_path.display()
                );
                process::exit(1);
            }
            print_summary(&secret_path, &codecs);
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
