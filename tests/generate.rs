//! End-to-end generation tests: full documents in, generated source out.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashSet;

use pretty_assertions::assert_eq;

use oxgen::{generate, generate_all, CallbackSink, Collector, Config, FeatureFlag, Mode, Severity};

fn types_of(document: &str) -> String {
    let config = Config::new(Mode::Types).with_flag(FeatureFlag::MultipleContentTypes);
    let mut sink = Collector::new();
    generate(document, &config, &mut sink).unwrap()
}

fn wrap_components(schemas_yaml: &str) -> String {
    format!(
        "openapi: '3.1.0'\ninfo: {{title: Test API, version: '1.0'}}\npaths: {{}}\n\
         components:\n  schemas:\n{schemas_yaml}"
    )
}

#[test]
fn mixed_optional_required_nullable_object() {
    let out = types_of(&wrap_components(
        r#"
    MyObj:
      type: object
      properties:
        a: {type: string}
        b: {type: string}
        c: {type: [string, 'null']}
        d: {type: [string, 'null']}
      required: [b, d]
"#,
    ));
    assert!(out.contains("pub struct MyObj {"));
    assert!(out.contains("pub a: Option<String>,"));
    assert!(out.contains("pub b: String,"));
    assert!(out.contains("pub c: Option<String>,"));
    assert!(out.contains("pub d: Option<String>,"));
    assert!(out.contains("pub fn new(b: String, d: Option<String>) -> Self"));
    assert!(out.contains("Self { a: None, b, c: None, d }"));
}

#[test]
fn one_of_with_discriminator_and_mapping() {
    let out = types_of(&wrap_components(
        r#"
    Which:
      oneOf:
        - {$ref: '#/components/schemas/A'}
        - {$ref: '#/components/schemas/B'}
        - {$ref: '#/components/schemas/C'}
      discriminator:
        propertyName: which
        mapping:
          a: '#/components/schemas/A'
          a2: '#/components/schemas/A'
          b: '#/components/schemas/B'
    A: {type: object, properties: {which: {type: string}}, required: [which]}
    B: {type: object, properties: {which: {type: string}}, required: [which]}
    C: {type: object, properties: {which: {type: string}}, required: [which]}
"#,
    ));
    assert!(out.contains("#[serde(tag = \"which\")]"));
    assert!(out.contains("a(A),"));
    assert!(out.contains("a2(A),"));
    assert!(out.contains("b(B),"));
    // The unmapped schema decodes from its name or its full $ref path.
    assert!(out.contains("#[serde(alias = \"#/components/schemas/C\")]"));
    assert!(out.contains("C(C),"));
    // Mapping entries precede the unmapped schema.
    assert!(out.find("a(A),").unwrap() < out.find("C(C),").unwrap());
}

#[test]
fn self_referential_schema_gets_boxed_storage() {
    let out = types_of(&wrap_components(
        r#"
    Node:
      type: object
      properties:
        parent: {$ref: '#/components/schemas/Node'}
"#,
    ));
    assert!(out.contains("struct NodeStorage {"));
    assert!(out.contains("#[serde(transparent)]"));
    assert!(out.contains("storage: Box<NodeStorage>,"));
    assert!(out.contains("pub fn parent(&self) -> &Option<Node>"));
    assert!(out.contains("pub fn parent_mut(&mut self) -> &mut Option<Node>"));
    // Exactly one storage indirection for the one cycle.
    assert_eq!(out.matches("Box<NodeStorage>").count(), 1);
}

const QUERY_DOC: &str = r#"
openapi: '3.1.0'
info: {title: Test API, version: '1.0'}
paths:
  /foo:
    get:
      operationId: getFoo
      parameters:
        - {name: single, in: query, schema: {type: string}}
        - {name: manyExploded, in: query, explode: true,
           schema: {type: array, items: {type: string}}}
        - {name: manyUnexploded, in: query, explode: false,
           schema: {type: array, items: {type: string}}}
      responses:
        '204': {description: done}
"#;

#[test]
fn query_parameters_preserve_explode() {
    let config = Config::new(Mode::Client);
    let mut sink = Collector::new();
    let client = generate(QUERY_DOC, &config, &mut sink).unwrap();
    assert!(client.contains(
        "runtime::set_query_item_as_uri(&mut request, \"single\", \
         runtime::Style::Form, true, &input.query.single)?;"
    ));
    assert!(client.contains(
        "runtime::set_query_item_as_uri(&mut request, \"manyExploded\", \
         runtime::Style::Form, true, &input.query.manyExploded)?;"
    ));
    assert!(client.contains(
        "runtime::set_query_item_as_uri(&mut request, \"manyUnexploded\", \
         runtime::Style::Form, false, &input.query.manyUnexploded)?;"
    ));

    let config = Config::new(Mode::Server);
    let mut sink = Collector::new();
    let server = generate(QUERY_DOC, &config, &mut sink).unwrap();
    for (name, explode) in [
        ("single", "true"),
        ("manyExploded", "true"),
        ("manyUnexploded", "false"),
    ] {
        assert!(
            server.contains(&format!(
                "let {name} = runtime::get_optional_query_item_as_uri(&parts, \"{name}\", \
                 runtime::Style::Form, {explode})?;"
            )),
            "missing server read for {name}:\n{server}"
        );
    }
}

#[test]
fn multipart_part_with_per_part_header() {
    let out = types_of(
        r#"
openapi: '3.1.0'
info: {title: Test API, version: '1.0'}
paths:
  /upload:
    post:
      operationId: upload
      requestBody:
        required: true
        content:
          multipart/form-data:
            schema:
              type: object
              properties:
                log: {type: string}
            encoding:
              log:
                headers:
                  x-log-type:
                    schema:
                      type: string
                      enum: [structured, unstructured]
      responses:
        '204': {description: done}
"#,
    );
    assert!(out.contains("pub enum x_hyphen_log_hyphen_typePayload {"));
    assert!(out.contains("structured,"));
    assert!(out.contains("unstructured,"));
    assert!(out.contains("pub struct logHeaders {"));
    assert!(out.contains("pub x_hyphen_log_hyphen_type: Option<x_hyphen_log_hyphen_typePayload>,"));
    assert!(out.contains("pub struct logBody {"));
    assert!(out.contains("pub headers: Option<logHeaders>,"));
    assert!(out.contains("pub body: runtime::ByteStream,"));
    assert!(out.contains("log(logBody),"));
}

#[test]
fn multipart_classes_reach_the_coder() {
    let config = Config::new(Mode::Client);
    let mut sink = Collector::new();
    let client = generate(
        r#"
openapi: '3.1.0'
info: {title: Test API, version: '1.0'}
paths:
  /upload:
    post:
      operationId: upload
      requestBody:
        required: true
        content:
          multipart/form-data:
            schema:
              type: object
              properties:
                log: {type: string}
      responses:
        '204': {description: done}
"#,
        &config,
        &mut sink,
    )
    .unwrap();
    assert!(client.contains(
        "runtime::MultipartClasses { required_exactly_once: &[], required_at_least_once: &[], \
         at_most_once: &[\"log\"], zero_or_more: &[] }"
    ));
}

#[test]
fn response_with_multiple_content_types() {
    let out = types_of(
        r#"
openapi: '3.1.0'
info: {title: Test API, version: '1.0'}
paths:
  /data:
    get:
      operationId: getData
      responses:
        '200':
          description: OK
          content:
            application/json:
              schema: {type: integer}
            application/json; foo=bar:
              schema: {type: integer}
            text/plain:
              schema: {}
            application/octet-stream:
              schema: {}
"#,
    );
    assert!(out.contains("pub enum OkBody {"));
    assert!(out.contains("json(i64),"));
    assert!(out.contains("application_json_foo_bar(i64),"));
    assert!(out.contains("plainText(runtime::ByteStream),"));
    assert!(out.contains("binary(runtime::ByteStream),"));
    // Declaration order survives into the enum.
    let json = out.find("json(i64),").unwrap();
    let parameterized = out.find("application_json_foo_bar(i64),").unwrap();
    let text = out.find("plainText(runtime::ByteStream),").unwrap();
    let binary = out.find("binary(runtime::ByteStream),").unwrap();
    assert!(json < parameterized && parameterized < text && text < binary);
    // Accessors raise "unexpected body" naming the expected media type.
    assert!(out.contains("pub fn as_json(&self) -> Result<&i64, runtime::UnexpectedBody>"));
    assert!(out.contains("runtime::UnexpectedBody::expected(\"application/octet-stream\")"));
}

#[test]
fn generated_output_is_deterministic() {
    let document = r#"
openapi: '3.1.0'
info: {title: Test API, version: '1.0'}
paths:
  /items/{id}:
    get:
      operationId: getItem
      parameters:
        - {name: id, in: path, required: true, schema: {type: string}}
      responses:
        '200':
          description: OK
          content:
            application/json:
              schema: {$ref: '#/components/schemas/Item'}
components:
  schemas:
    Item:
      type: object
      properties:
        id: {type: string}
        tags: {type: array, items: {type: string}}
      required: [id]
"#;
    let config = Config::new(Mode::Types);
    let mut sink = Collector::new();
    let first = generate_all(document, &config, &mut sink).unwrap();
    let mut sink = Collector::new();
    let second = generate_all(document, &config, &mut sink).unwrap();
    assert_eq!(first.types, second.types);
    assert_eq!(first.client, second.client);
    assert_eq!(first.server, second.server);
}

#[test]
fn top_level_schema_identifiers_are_unique() {
    let out = types_of(&wrap_components(
        r#"
    Alpha: {type: object, properties: {x: {type: string}}}
    Beta: {type: object, properties: {x: {type: string}}}
    Gamma:
      type: object
      properties:
        value:
          oneOf:
            - {type: string}
            - {type: integer}
"#,
    ));
    let mut names = HashSet::new();
    for line in out.lines() {
        let trimmed = line.trim_start();
        for keyword in ["pub struct ", "pub enum ", "pub type "] {
            if let Some(rest) = trimmed.strip_prefix(keyword) {
                let name: String = rest
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                    .collect();
                assert!(
                    names.insert(name.clone()),
                    "duplicate identifier '{name}' in:\n{out}"
                );
            }
        }
    }
    assert!(names.contains("Alpha") && names.contains("Beta"));
}

#[test]
fn every_field_type_resolves_in_the_emitted_file() {
    let out = types_of(&wrap_components(
        r#"
    Outer:
      type: object
      properties:
        inner: {$ref: '#/components/schemas/Inner'}
        payload:
          type: object
          properties:
            deep: {type: string}
      required: [inner]
    Inner: {type: string}
"#,
    ));
    // The reference and the synthesized payload both resolve to emitted
    // declarations.
    assert!(out.contains("pub inner: Inner,"));
    assert!(out.contains("pub type Inner = String;"));
    assert!(out.contains("pub payload: Option<payloadPayload>,"));
    assert!(out.contains("pub struct payloadPayload {"));
}

#[test]
fn warnings_do_not_abort_generation() {
    let config = Config::new(Mode::Types);
    let mut sink = Collector::new();
    let out = generate(
        &wrap_components(
            r#"
    Upload:
      type: object
      properties:
        data: {type: string, format: binary}
        name: {type: string}
      required: [name, ghost]
"#,
        ),
        &config,
        &mut sink,
    )
    .unwrap();
    assert!(out.contains("pub struct Upload {"));
    assert!(out.contains("pub name: String,"));
    // binary property skipped + ghost required name ignored.
    assert_eq!(sink.warnings().count(), 2);
    assert!(!sink.has_errors());
}

#[test]
fn callback_sink_receives_diagnostics() {
    let mut seen: Vec<(Severity, String)> = Vec::new();
    let mut sink = CallbackSink(|severity: Severity, message: &str| {
        seen.push((severity, message.to_string()));
    });
    let config = Config::new(Mode::Types);
    generate(
        &wrap_components("    Level: {type: integer, enum: [1, 2]}\n"),
        &config,
        &mut sink,
    )
    .unwrap();
    assert!(seen
        .iter()
        .any(|(severity, _)| *severity == Severity::Warning));
}

#[test]
fn all_three_modes_share_envelope_names() {
    let document = r#"
openapi: '3.1.0'
info: {title: Test API, version: '1.0'}
paths:
  /pets:
    post:
      operationId: createPet
      requestBody:
        required: true
        content:
          application/json:
            schema: {$ref: '#/components/schemas/Pet'}
      responses:
        '201':
          description: created
          content:
            application/json:
              schema: {$ref: '#/components/schemas/Pet'}
components:
  schemas:
    Pet:
      type: object
      properties:
        name: {type: string}
      required: [name]
"#;
    let config = Config::new(Mode::Types);
    let mut sink = Collector::new();
    let files = generate_all(document, &config, &mut sink).unwrap();
    assert!(files.types.contains("pub enum Body {"));
    assert!(files.types.contains("pub struct CreatedResponse {"));
    assert!(files
        .client
        .contains("operations::createPet::Body::json(value)"));
    assert!(files
        .client
        .contains("Ok(operations::createPet::Output::Created(operations::createPet::CreatedResponse { body }))"));
    assert!(files
        .server
        .contains("operations::createPet::Output::Created(value)"));
    assert!(files.server.contains(
        "transport.register(runtime::Method::Post, \"/pets\", runtime::handler!(server, createPet));"
    ));
}
