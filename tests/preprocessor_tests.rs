use crud_lineage::{
    catalog::SchemaCatalog,
    preprocessor::{Preprocessor, SqlSource},
    query::{SqlDialect, parse_statement},
    resolve::{Resolver, ResolverConfig}
};

#[test]
fn test_where_block_with_conditions() {
    let sql = r#"SELECT id, name FROM users
        <where>
            <if test="id != null">AND id = #{id}</if>
            <if test="name != null">AND name LIKE #{name}</if>
        </where>"#;
    let result = Preprocessor::new(SqlSource::MyBatis).process(sql);
    assert_eq!(
        result.sql,
        "SELECT id, name FROM users WHERE id = ? AND name LIKE ?"
    );
    assert_eq!(result.metadata.parameters, vec!["id", "name"]);
}

#[test]
fn test_preprocessed_text_parses_and_resolves() {
    let sql = r#"UPDATE users <set><if test="name != null">name = #{name},</if></set> WHERE id = #{id}"#;
    let result = Preprocessor::new(SqlSource::MyBatis)
        .for_dialect(SqlDialect::PostgreSQL)
        .process(sql);
    assert_eq!(result.sql, "UPDATE users SET name = $1 WHERE id = $2");
    let stmt = parse_statement(&result.sql, SqlDialect::PostgreSQL).unwrap();
    let catalog = SchemaCatalog::default();
    let res = Resolver::new(&catalog, ResolverConfig::default()).resolve(&stmt, None);
    let columns: Vec<_> = res.statement.columns_of("users").unwrap().iter().collect();
    assert_eq!(columns, vec!["id", "name"]);
}

#[test]
fn test_plain_source_is_untouched() {
    let sql = "SELECT a  FROM t";
    let result = Preprocessor::new(SqlSource::Plain).process(sql);
    assert_eq!(result.sql, sql);
}
