mod find_test;
mod malformed_query_test;
