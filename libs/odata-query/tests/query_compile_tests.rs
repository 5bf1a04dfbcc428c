#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end compilation of whole queries into raw parameter strings.
//!
//! Every query here is built from explicit paging defaults (`top=10`,
//! `skip=0`, counting on) so the suite never touches the process-wide
//! defaults.

use chrono::{FixedOffset, TimeZone};
use odata_query::{
    CompareOp, Error, Expand, ODataQuery, OperandOrder, QueryDefaults, QueryKey, ScopeKind,
};

const PAGING: &str = "$top=10&$skip=0&$count=true";

fn paged() -> ODataQuery {
    ODataQuery::with_defaults(&QueryDefaults {
        default_top: Some(10),
        default_skip: Some(0),
        pagination_enabled: true,
        default_show_count: true,
    })
}

/// Unencoded `k=v&k=v`, the form a server sees after decoding.
fn raw(query: &ODataQuery) -> String {
    query
        .params()
        .unwrap()
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn with_paging(prefix: &str) -> String {
    format!("{prefix}&{PAGING}")
}

mod select {
    use super::*;

    #[test]
    fn select_all() {
        let mut q = paged();
        q.select("*");
        assert_eq!(raw(&q), with_paging("$select=*"));
    }

    #[test]
    fn select_single_field() {
        let mut q = paged();
        q.select("Id");
        assert_eq!(raw(&q), with_paging("$select=Id"));
    }

    #[test]
    fn select_string_and_list_agree() {
        let mut a = paged();
        a.select("Id,Name");
        let mut b = paged();
        b.select(["Id", "Name"]);
        assert_eq!(raw(&a), with_paging("$select=Id,Name"));
        assert_eq!(raw(&a), raw(&b));
    }

    #[test]
    fn no_select_only_paging() {
        assert_eq!(raw(&paged()), PAGING);
    }

    #[test]
    fn blank_entries_are_kept_verbatim() {
        let mut a = paged();
        a.select("Id,");
        let mut b = paged();
        b.select(["Id", ""]);
        assert_eq!(raw(&a), with_paging("$select=Id,"));
        assert_eq!(raw(&a), raw(&b));
    }
}

mod filter {
    use super::*;

    #[test]
    fn single_comparison() {
        let mut q = paged();
        q.filter.compare("Id", CompareOp::Eq, 1);
        assert_eq!(raw(&q), with_paging("$filter=Id eq 1"));
    }

    #[test]
    fn combined_comparisons() {
        let mut q = paged();
        q.filter
            .compare("Id", CompareOp::Gt, 1)
            .and()
            .compare("Name", CompareOp::Ne, "test");
        assert_eq!(
            raw(&q),
            with_paging("$filter=Id gt 1 and Name ne 'test'")
        );
    }

    #[test]
    fn function_with_local_date_is_normalized_to_utc() {
        let plus3 = FixedOffset::east_opt(3 * 3600).unwrap();
        let date = plus3.with_ymd_and_hms(2018, 2, 1, 0, 0, 0).unwrap();

        let mut q = paged();
        q.filter.compare("date", CompareOp::Contains, date);
        assert_eq!(
            raw(&q),
            with_paging("$filter=contains(date,2018-01-31T21:00:00.000Z)")
        );
    }

    #[test]
    fn mixed_groups_and_functions() {
        let mut q = paged();
        q.filter
            .compare("name", CompareOp::Contains, "test")
            .and()
            .open_group()
            .compare("name", CompareOp::Contains, "test2")
            .or()
            .compare("name", CompareOp::EndsWith, "test3")
            .end_group();
        assert_eq!(
            raw(&q),
            with_paging(
                "$filter=contains(name,'test') and (contains(name,'test2') or endsWith(name,'test3'))"
            )
        );
    }

    #[test]
    fn negation() {
        let mut q = paged();
        q.filter.negate_next().compare("Id", CompareOp::Eq, 1);
        assert_eq!(raw(&q), with_paging("$filter=Not Id eq 1"));

        let mut q = paged();
        q.filter
            .negate_next()
            .compare("Id", CompareOp::Contains, 1)
            .and()
            .compare("Name", CompareOp::Ne, "test");
        assert_eq!(
            raw(&q),
            with_paging("$filter=Not contains(Id,1) and Name ne 'test'")
        );
    }

    #[test]
    fn value_first_operands() {
        let mut q = paged();
        q.filter
            .compare_with("Tags", CompareOp::Contains, "rust", OperandOrder::ValueFirst);
        assert_eq!(raw(&q), with_paging("$filter=contains('rust',Tags)"));
    }
}

mod lambdas {
    use super::*;

    #[test]
    fn any_single() {
        let mut q = paged();
        q.filter
            .begin_any("Posts")
            .compare("Id", CompareOp::Eq, 1)
            .end_any()
            .unwrap();
        assert_eq!(raw(&q), with_paging("$filter=Posts/any(x:x/Id eq 1)"));
    }

    #[test]
    fn any_with_or() {
        let mut q = paged();
        q.filter
            .begin_any("Posts")
            .compare("Id", CompareOp::Eq, 1)
            .or()
            .compare("Name", CompareOp::Ne, "test")
            .end_any()
            .unwrap();
        assert_eq!(
            raw(&q),
            with_paging("$filter=Posts/any(x:x/Id eq 1 or x/Name ne 'test')")
        );
    }

    #[test]
    fn sibling_any_blocks_get_fresh_variables() {
        let mut q = paged();
        q.filter
            .begin_any("Posts")
            .compare("Id", CompareOp::Eq, 1)
            .end_any()
            .unwrap()
            .and()
            .begin_any("Tags")
            .compare("Name", CompareOp::Eq, "rust")
            .end_any()
            .unwrap();
        assert_eq!(
            raw(&q),
            with_paging("$filter=Posts/any(x:x/Id eq 1) and Tags/any(y:y/Name eq 'rust')")
        );
    }

    #[test]
    fn any_with_group_and_nested_any() {
        let mut q = paged();
        q.filter
            .begin_any("Posts")
            .compare("Id", CompareOp::Eq, 1)
            .and()
            .open_group()
            .compare("Name", CompareOp::Ne, "test")
            .or()
            .compare("Name", CompareOp::EndsWith, "test3")
            .end_group()
            .and()
            .begin_any("Authors")
            .compare("Name", CompareOp::EndsWith, "mes")
            .end_any()
            .unwrap()
            .end_any()
            .unwrap();
        assert_eq!(
            raw(&q),
            with_paging(
                "$filter=Posts/any(x:x/Id eq 1 and (x/Name ne 'test' or endsWith(x/Name,'test3')) and x/Authors/any(y:endsWith(y/Name,'mes')))"
            )
        );
    }

    #[test]
    fn directly_nested_any() {
        let mut q = paged();
        q.filter
            .begin_any("Posts")
            .begin_any("Post/Authors")
            .compare("Name", CompareOp::EndsWith, "mes")
            .end_any()
            .unwrap()
            .end_any()
            .unwrap();
        assert_eq!(
            raw(&q),
            with_paging("$filter=Posts/any(x:x/Post/Authors/any(y:endsWith(y/Name,'mes')))")
        );
    }

    #[test]
    fn all_with_or() {
        let mut q = paged();
        q.filter
            .begin_all("Posts")
            .compare("Id", CompareOp::Eq, 1)
            .or()
            .compare("Name", CompareOp::Ne, "test")
            .end_all()
            .unwrap();
        assert_eq!(
            raw(&q),
            with_paging("$filter=Posts/all(x:x/Id eq 1 or x/Name ne 'test')")
        );
    }

    #[test]
    fn nested_all_gets_next_variable() {
        let mut q = paged();
        q.filter
            .begin_all("Posts")
            .compare("Id", CompareOp::Eq, 1)
            .and()
            .begin_all("Authors")
            .compare("Name", CompareOp::EndsWith, "mes")
            .end_all()
            .unwrap()
            .end_all()
            .unwrap();
        assert_eq!(
            raw(&q),
            with_paging("$filter=Posts/all(x:x/Id eq 1 and x/Authors/all(y:endsWith(y/Name,'mes')))")
        );
    }

    #[test]
    fn count_single() {
        let mut q = paged();
        q.filter
            .begin_count("Posts")
            .compare("Id", CompareOp::Eq, 1)
            .end_count(CompareOp::Eq, 1)
            .unwrap();
        assert_eq!(
            raw(&q),
            with_paging("$filter=Posts/count($filter=Id eq 1) eq 1")
        );
    }

    #[test]
    fn count_twice() {
        let mut q = paged();
        q.filter
            .begin_count("Posts")
            .compare("Id", CompareOp::Eq, 1)
            .end_count(CompareOp::Eq, 1)
            .unwrap()
            .and()
            .begin_count("Authors")
            .compare("Name", CompareOp::EndsWith, "mes")
            .end_count(CompareOp::Eq, 1)
            .unwrap();
        assert_eq!(
            raw(&q),
            with_paging(
                "$filter=Posts/count($filter=Id eq 1) eq 1 and Authors/count($filter=endsWith(Name,'mes')) eq 1"
            )
        );
    }

    #[test]
    fn unterminated_scope_fails_compile() {
        let mut q = paged();
        q.filter
            .begin_any("Posts")
            .compare("Id", CompareOp::Eq, 1);
        assert_eq!(
            q.compile().unwrap_err(),
            Error::UnterminatedScope {
                kind: ScopeKind::Any,
                depth: 1
            }
        );
    }

    #[test]
    fn closing_wrong_kind_fails() {
        let mut q = paged();
        let err = q
            .filter
            .begin_any("Posts")
            .compare("Id", CompareOp::Eq, 1)
            .end_all()
            .err()
            .expect("mismatched close must fail");
        assert_eq!(
            err,
            Error::ScopeMismatch {
                close: ScopeKind::All,
                open: ScopeKind::Any
            }
        );
    }
}

mod expand {
    use super::*;

    #[test]
    fn bare_relation() {
        let mut q = paged();
        q.expand.add("Posts");
        assert_eq!(raw(&q), with_paging("$expand=Posts"));
    }

    #[test]
    fn relation_with_select() {
        let mut q = paged();
        q.expand.add("Posts").select("Id,Name");
        assert_eq!(raw(&q), with_paging("$expand=Posts($select=Id,Name)"));
    }

    #[test]
    fn relation_with_select_and_filter() {
        let mut q = paged();
        q.expand
            .add("Posts")
            .select("Id,Name")
            .begin_filter()
            .compare("Id", CompareOp::Eq, 1)
            .end_expand_filter()
            .unwrap();
        assert_eq!(
            raw(&q),
            with_paging("$expand=Posts($select=Id,Name;$filter=Id eq 1)")
        );
    }

    #[test]
    fn nested_tree_with_siblings() {
        let mut q = paged();
        q.expand
            .add("Posts")
            .select("Id,Name")
            .begin_filter()
            .compare("Id", CompareOp::Eq, 1)
            .and()
            .compare("Name", CompareOp::Contains, "1")
            .end_expand_filter()
            .unwrap()
            .expand("Authors")
            .select("Id,Name");
        q.expand.add("Authors").select("Id,Name");

        assert_eq!(
            raw(&q),
            with_paging(
                "$expand=Posts($select=Id,Name;$expand=Authors($select=Id,Name);$filter=Id eq 1 and contains(Name,'1')),Authors($select=Id,Name)"
            )
        );
    }

    #[test]
    fn nested_order_by() {
        let mut q = paged();
        q.expand
            .add("Posts")
            .begin_order_by()
            .desc("Created")
            .end_expand_order_by()
            .select(["Id"]);
        assert_eq!(
            raw(&q),
            with_paging("$expand=Posts($select=Id;$orderby=Created desc)")
        );
    }

    #[test]
    fn prebuilt_node() {
        let mut node = Expand::new("Tags");
        node.select("Name");
        let mut q = paged();
        q.expand.push(node);
        assert_eq!(raw(&q), with_paging("$expand=Tags($select=Name)"));
    }

    #[test]
    fn nested_select_is_verbatim() {
        let mut q = paged();
        q.expand.add("Posts").expand("Authors").select("Id,");
        assert_eq!(raw(&q), with_paging("$expand=Posts($expand=Authors($select=Id,))"));
    }

    #[test]
    fn nested_unterminated_scope_fails() {
        let mut q = paged();
        q.expand
            .add("Posts")
            .begin_filter()
            .begin_any("Tags")
            .compare("Name", CompareOp::Eq, "a");
        assert!(matches!(
            q.compile(),
            Err(Error::UnterminatedScope { .. })
        ));
    }
}

mod order_by {
    use super::*;

    #[test]
    fn asc_and_desc() {
        let mut q = paged();
        q.order_by.asc("Id");
        assert_eq!(raw(&q), with_paging("$orderby=Id asc"));

        let mut q = paged();
        q.order_by.desc("Id");
        assert_eq!(raw(&q), with_paging("$orderby=Id desc"));
    }

    #[test]
    fn multiple_keys() {
        let mut q = paged();
        q.order_by.asc("Id").asc("Name");
        assert_eq!(raw(&q), with_paging("$orderby=Id asc,Name asc"));
    }
}

mod container {
    use super::*;

    #[test]
    fn keys_follow_fixed_order() {
        let mut q = paged();
        q.order_by.asc("Id");
        q.filter.compare("Id", CompareOp::Gt, 0);
        q.expand.add("Posts");
        q.select("Id");
        assert_eq!(
            q.compile().unwrap().keys(),
            vec![
                QueryKey::Select,
                QueryKey::Expand,
                QueryKey::Filter,
                QueryKey::OrderBy,
                QueryKey::Top,
                QueryKey::Skip,
                QueryKey::Count,
            ]
        );
    }

    #[test]
    fn compile_is_idempotent() {
        let mut q = paged();
        q.select("Id");
        q.filter
            .begin_any("Posts")
            .compare("Id", CompareOp::Eq, 1)
            .end_any()
            .unwrap();
        q.expand.add("Authors").select("Name");
        assert_eq!(q.compile().unwrap(), q.compile().unwrap());
        assert_eq!(raw(&q), raw(&q));
    }

    #[test]
    fn each_key_appears_once() {
        let mut q = paged();
        q.select("Id");
        q.filter.compare("Id", CompareOp::Eq, 1);
        let params = q.params().unwrap();
        for key in ["$select", "$filter", "$top", "$skip", "$count"] {
            assert_eq!(params.get_all(key).len(), 1, "{key}");
        }
    }

    #[test]
    fn encoded_query_string() {
        let mut q = paged();
        q.select("Id,Name");
        q.filter.compare("Name", CompareOp::Eq, "a b");
        assert_eq!(
            q.to_query_string().unwrap(),
            "$select=Id,Name&$filter=Name%20eq%20'a%20b'&$top=10&$skip=0&$count=true"
        );
    }

    #[test]
    fn request_url_attaches_query() {
        let mut q = paged();
        q.url("https://api.example.com/odata/People");
        q.filter.compare("Id", CompareOp::Eq, 1);
        let url = q.request_url().unwrap();
        assert_eq!(url.path(), "/odata/People");
        assert_eq!(
            url.query(),
            Some("$filter=Id%20eq%201&$top=10&$skip=0&$count=true")
        );
    }
}
