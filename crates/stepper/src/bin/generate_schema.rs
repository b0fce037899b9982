use glass_stepper::Step;
use schemars::schema_for;

// Prints the JSON Schema for step registry files, as YAML.
fn main() -> anyhow::Result<()> {
    println!("---");
    println!("# Step registry schema");
    println!("{}", serde_yaml::to_string(&schema_for!(Vec<Step>))?);
    Ok(())
}
