mod test_candidate_buffer_flushes_in_order;
mod test_close_all_is_idempotent;
mod test_get_or_create_is_memoized;
