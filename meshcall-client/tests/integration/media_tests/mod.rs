mod test_permission_denied_waits_for_retry;
