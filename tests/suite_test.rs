use jsv::{Builder, MemoryLoader};
use serde::Deserialize;
use serde_json::Value;
use std::fs;

#[derive(Deserialize)]
struct TestGroup {
    description: String,
    schema: Value,
    tests: Vec<TestCase>,
}

#[derive(Deserialize)]
struct TestCase {
    description: String,
    data: Value,
    valid: bool,
}

#[test]
fn suite() -> Result<(), std::io::Error> {
    let mut entries: Vec<_> = fs::read_dir("tests/fixtures")?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<_, _>>()?;
    entries.sort();
    assert!(!entries.is_empty());

    for path in entries {
        println!("{:?}", &path);
        let file = fs::read(&path)?;
        let groups: Vec<TestGroup> = serde_json::from_slice(&file)?;

        for group in groups {
            println!("{}", group.description);

            let mut builder = Builder::with_loader(MemoryLoader::new());
            let schema = builder.inflate_value(&group.schema).unwrap();
            let registry = builder.into_registry();

            for test in group.tests {
                let result = registry.validate(schema, &test.data);
                assert_eq!(
                    test.valid,
                    result.is_valid(),
                    "{} / {}: {:?}",
                    group.description,
                    test.description,
                    result.errors()
                );
                assert_eq!(result.is_valid(), result.errors().is_empty());
            }
        }
    }

    Ok(())
}
