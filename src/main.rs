use vector_ngin::{config::Config, demo::run_playground};

fn main() -> anyhow::Result<()> {
    run_playground(Config::default())
}
