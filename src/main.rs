use hms_odoo_export::{args, cli};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    cli::main(args::parse())
}
