mod test_auth_error_ends_call;
mod test_restart_rejoins_with_fresh_id;
mod test_two_clients_connect_via_relay;
