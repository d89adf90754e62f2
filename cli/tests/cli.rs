#![cfg(test)]
#![allow(clippy::panic_in_result_fn)]

use anyhow::Result;
use assert_cmd::Command;
use assert_fs::NamedTempFile;
use assert_fs::prelude::*;
use predicates::prelude::*;

const SHAPES: &str = r#"
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix schema: <http://schema.org/> .
@prefix ex: <http://example.org/shapes#> .

ex:ContactShape a sh:NodeShape ;
    sh:targetClass schema:Person ;
    sh:property [ sh:path schema:givenName ; sh:datatype xsd:string ; sh:minCount 1 ; sh:maxCount 1 ] ;
    sh:property [ sh:path schema:familyName ; sh:datatype xsd:string ; sh:minCount 1 ; sh:maxCount 1 ] ;
    sh:property [ sh:path schema:address ; sh:class schema:PostalAddress ; sh:maxCount 1 ] .

ex:AddressShape a sh:NodeShape ;
    sh:targetClass schema:PostalAddress ;
    sh:property [ sh:path schema:streetAddress ; sh:name "streetLine" ; sh:datatype xsd:string ; sh:maxCount 1 ] .
"#;

const TDUPONT: &str = r#"
@prefix schema: <http://schema.org/> .
<> a schema:Person ;
    schema:givenName "Thomas" ;
    schema:familyName "Dupont" ;
    schema:address <#address> .
<#address> a schema:PostalAddress ; schema:streetAddress "Gerard Franchoostraat 6" .
"#;

const CONFIG: &str = r#"{
    "targets": {
        "http://schema.org/Person": "http://example.org/cont/",
        "http://schema.org/PostalAddress": "http://example.org/cont/"
    }
}"#;

fn cli_command() -> Result<Command> {
    Ok(Command::cargo_bin("shapeql")?)
}

fn shapes_file() -> Result<NamedTempFile> {
    let file = NamedTempFile::new("shapes.ttl")?;
    file.write_str(SHAPES)?;
    Ok(file)
}

fn query_command(
    shapes: &NamedTempFile,
    config: &NamedTempFile,
    fixture: &NamedTempFile,
) -> Result<Command> {
    let mut command = cli_command()?;
    command
        .arg("query")
        .arg("--shapes")
        .arg(shapes.path())
        .arg("--config")
        .arg(config.path())
        .arg("--container")
        .arg("http://example.org/cont/")
        .arg("--fixture")
        .arg(format!("http://example.org/cont/tdupont={}", fixture.path().display()));
    Ok(command)
}

fn query_files() -> Result<(NamedTempFile, NamedTempFile, NamedTempFile)> {
    let config = NamedTempFile::new("config.json")?;
    config.write_str(CONFIG)?;
    let fixture = NamedTempFile::new("tdupont.ttl")?;
    fixture.write_str(TDUPONT)?;
    Ok((shapes_file()?, config, fixture))
}

#[test]
fn cli_help() -> Result<()> {
    cli_command()?
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("Usage"));
    Ok(())
}

#[test]
fn cli_schema() -> Result<()> {
    let shapes = shapes_file()?;
    cli_command()?
        .arg("schema")
        .arg("--shapes")
        .arg(shapes.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("directive @identifier on FIELD_DEFINITION")
                .and(predicate::str::contains(
                    "type Contact @is(class: \"http://schema.org/Person\")",
                ))
                .and(predicate::str::contains("contactCollection: [Contact!]!"))
                .and(predicate::str::contains(
                    "createContact(input: CreateContactInput!): Contact!",
                ))
                .and(predicate::str::contains("mutateContact(id: ID!): ContactMutation"))
                .and(predicate::str::contains("setAddress(input: CreateAddressInput!): Contact!")),
        );
    Ok(())
}

#[test]
fn cli_schema_invalid_shapes() -> Result<()> {
    let shapes = NamedTempFile::new("shapes.ttl")?;
    shapes.write_str("<http://example.org/s> <http://example.org/p> .")?;
    cli_command()?
        .arg("schema")
        .arg("--shapes")
        .arg(shapes.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
    Ok(())
}

#[test]
fn cli_schema_unknown_extension() -> Result<()> {
    let shapes = NamedTempFile::new("shapes.foo")?;
    shapes.write_str(SHAPES)?;
    cli_command()?
        .arg("schema")
        .arg("--shapes")
        .arg(shapes.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("'foo' is unknown"));
    Ok(())
}

#[test]
fn cli_query_from_stdin() -> Result<()> {
    let (shapes, config, fixture) = query_files()?;
    query_command(&shapes, &config, &fixture)?
        .write_stdin(
            r#"{ contact(id: "http://example.org/cont/tdupont") { givenName familyName address { streetLine } } }"#,
        )
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""givenName": "Thomas""#)
                .and(predicate::str::contains(r#""familyName": "Dupont""#))
                .and(predicate::str::contains(r#""streetLine": "Gerard Franchoostraat 6""#)),
        );
    Ok(())
}

#[test]
fn cli_query_file_with_variables() -> Result<()> {
    let (shapes, config, fixture) = query_files()?;
    let query = NamedTempFile::new("query.graphql")?;
    query.write_str(
        r#"mutation Flip($id: ID!) {
            mutateContact(id: $id) { update(input: { givenName: "Dupont", familyName: "Thomas" }) { givenName familyName } }
        }"#,
    )?;
    query_command(&shapes, &config, &fixture)?
        .arg("--query")
        .arg(query.path())
        .arg("--variables")
        .arg(r#"{"id": "http://example.org/cont/tdupont"}"#)
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""givenName": "Dupont""#)
                .and(predicate::str::contains(r#""familyName": "Thomas""#)),
        );
    Ok(())
}

#[test]
fn cli_query_errors() -> Result<()> {
    let (shapes, config, fixture) = query_files()?;
    query_command(&shapes, &config, &fixture)?
        .write_stdin(
            r#"mutation { mutateContact(id: "http://example.org/cont/tdupont") { update(input: { givenName: null }) { givenName } } }"#,
        )
        .assert()
        .failure()
        .stdout(predicate::str::contains("non-nullable"))
        .stderr(predicate::str::contains("1 error(s)"));
    Ok(())
}

#[test]
fn cli_invalid_fixture_argument() -> Result<()> {
    let shapes = shapes_file()?;
    cli_command()?
        .arg("query")
        .arg("--shapes")
        .arg(shapes.path())
        .arg("--fixture")
        .arg("tdupont.ttl")
        .assert()
        .failure()
        .stderr(predicate::str::contains("expecting URL=FILE"));
    Ok(())
}
